//! # Emotion Classifier
//!
//! Multinomial Naive Bayes over the tokens produced by [`crate::text::tokenize`].
//!
//! Training is incremental: every [`NaiveBayes::add_document`] call updates
//! per-label counts directly, so there is no separate fit step and a model
//! restored from disk can keep learning.
//!
//! Scoring for a label `c` over known tokens `t`:
//!
//! ```text
//! ln P(c) + Σ ln((count(t, c) + α) / (total(c) + α·|V|))
//! ```
//!
//! All maps are `BTreeMap` so iteration order, tie-breaking and the
//! serialized form are deterministic.

use crate::text::{normalize_label, tokenize};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Laplace smoothing used when none is given.
pub const DEFAULT_ALPHA: f64 = 1.0;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier has not been trained on any documents")]
    NotTrained,
}

// =============================================================================
// LABEL STATISTICS
// =============================================================================

/// Counts accumulated for a single label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LabelStats {
    /// Number of training documents carrying this label.
    documents: u64,
    /// Token -> occurrences across this label's documents.
    tokens: BTreeMap<String, u64>,
    /// Sum of `tokens` values.
    total_tokens: u64,
}

/// A label with its posterior probability, as returned by
/// [`NaiveBayes::classify_ranked`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub label: String,
    pub probability: f64,
}

// =============================================================================
// NAIVE BAYES
// =============================================================================

/// Bag-of-words multinomial Naive Bayes classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayes {
    alpha: f64,
    labels: BTreeMap<String, LabelStats>,
    vocabulary: BTreeSet<String>,
    documents: u64,
}

impl Default for NaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl NaiveBayes {
    /// Create an empty classifier with [`DEFAULT_ALPHA`] smoothing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_smoothing(DEFAULT_ALPHA)
    }

    /// Create an empty classifier with custom additive smoothing.
    ///
    /// Non-finite or non-positive values fall back to [`DEFAULT_ALPHA`].
    #[must_use]
    pub fn with_smoothing(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha
        } else {
            DEFAULT_ALPHA
        };
        Self {
            alpha,
            labels: BTreeMap::new(),
            vocabulary: BTreeSet::new(),
            documents: 0,
        }
    }

    /// Learn from one labelled document.
    ///
    /// Returns `false` (and learns nothing) when the text normalizes to
    /// nothing or the label is blank. A document whose tokens are all
    /// stopwords still counts toward the label prior.
    pub fn add_document(&mut self, text: &str, label: &str) -> bool {
        let label = normalize_label(label);
        if label.is_empty() || crate::text::normalize(text).is_empty() {
            return false;
        }

        let stats = self.labels.entry(label).or_default();
        stats.documents = stats.documents.saturating_add(1);

        for token in tokenize(text) {
            stats.total_tokens = stats.total_tokens.saturating_add(1);
            let count = stats.tokens.entry(token.clone()).or_insert(0);
            *count = count.saturating_add(1);
            self.vocabulary.insert(token);
        }

        self.documents = self.documents.saturating_add(1);
        true
    }

    /// Most likely label for `text`.
    ///
    /// Ties resolve to the lexicographically smallest label. Text with no
    /// known tokens falls back to the label with the highest prior.
    pub fn classify(&self, text: &str) -> Result<String, ClassifierError> {
        let scores = self.log_scores(text)?;

        let mut best: Option<(&str, f64)> = None;
        for (label, score) in &scores {
            match best {
                Some((_, top)) if *score <= top => {}
                _ => best = Some((label, *score)),
            }
        }

        best.map(|(label, _)| label.to_owned())
            .ok_or(ClassifierError::NotTrained)
    }

    /// Every label with its posterior probability, most likely first.
    pub fn classify_ranked(&self, text: &str) -> Result<Vec<RankedLabel>, ClassifierError> {
        let scores = self.log_scores(text)?;

        let max = scores
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<(&str, f64)> = scores
            .iter()
            .map(|(label, score)| (*label, (score - max).exp()))
            .collect();
        let sum: f64 = exps.iter().map(|(_, e)| e).sum();

        let mut ranked: Vec<RankedLabel> = exps
            .into_iter()
            .map(|(label, e)| RankedLabel {
                label: label.to_owned(),
                probability: if sum > 0.0 { e / sum } else { 0.0 },
            })
            .collect();

        ranked.sort_by(|a, b| match b.probability.total_cmp(&a.probability) {
            Ordering::Equal => a.label.cmp(&b.label),
            other => other,
        });

        Ok(ranked)
    }

    /// Known labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Number of documents learned.
    #[must_use]
    pub fn document_count(&self) -> u64 {
        self.documents
    }

    /// Number of distinct tokens seen during training.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.documents > 0
    }

    fn log_scores(&self, text: &str) -> Result<BTreeMap<&str, f64>, ClassifierError> {
        if !self.is_trained() {
            return Err(ClassifierError::NotTrained);
        }

        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| self.vocabulary.contains(t))
            .collect();

        let total_docs = self.documents as f64;
        let vocab = self.vocabulary.len() as f64;

        let scores = self
            .labels
            .iter()
            .map(|(label, stats)| {
                let prior = (stats.documents as f64 / total_docs).ln();
                let denominator = stats.total_tokens as f64 + self.alpha * vocab;
                let likelihood: f64 = tokens
                    .iter()
                    .map(|t| {
                        let count = stats.tokens.get(t).copied().unwrap_or(0) as f64;
                        ((count + self.alpha) / denominator).ln()
                    })
                    .sum();
                (label.as_str(), prior + likelihood)
            })
            .collect();

        Ok(scores)
    }
}

// =============================================================================
// TESTS
// =============================================================================

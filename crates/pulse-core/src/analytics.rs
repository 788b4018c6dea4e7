//! # Analytics Module
//!
//! Dashboard aggregates over stored feedback: emotion distribution,
//! average rating and total count. Built in one pass by feeding every
//! record through a [`SummaryBuilder`].

use crate::Feedback;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of feedback entries carrying one emotion label.
///
/// `emotion` is `None` for entries stored without a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmotionCount {
    pub emotion: Option<String>,
    pub count: u64,
}

/// Aggregated view for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Sorted by descending count, then ascending emotion.
    pub by_emotion: Vec<EmotionCount>,
    /// Mean rating, `0.0` when there is no feedback.
    pub avg_rating: f64,
    pub total_feedback: u64,
}

/// Single-pass accumulator for [`Summary`].
#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder {
    by_emotion: BTreeMap<Option<String>, u64>,
    rating_sum: u64,
    total: u64,
}

impl SummaryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, feedback: &Feedback) {
        *self.by_emotion.entry(feedback.emotion.clone()).or_insert(0) += 1;
        self.rating_sum += u64::from(feedback.rating.get());
        self.total += 1;
    }

    #[must_use]
    pub fn finish(self) -> Summary {
        let mut by_emotion: Vec<EmotionCount> = self
            .by_emotion
            .into_iter()
            .map(|(emotion, count)| EmotionCount { emotion, count })
            .collect();
        // BTreeMap order already sorts by emotion; a stable sort keeps it for ties.
        by_emotion.sort_by(|a, b| b.count.cmp(&a.count));

        let avg_rating = if self.total == 0 {
            0.0
        } else {
            self.rating_sum as f64 / self.total as f64
        };

        Summary {
            by_emotion,
            avg_rating,
            total_feedback: self.total,
        }
    }
}

impl<'a> FromIterator<&'a Feedback> for Summary {
    fn from_iter<I: IntoIterator<Item = &'a Feedback>>(iter: I) -> Self {
        let mut builder = SummaryBuilder::new();
        for feedback in iter {
            builder.add(feedback);
        }
        builder.finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

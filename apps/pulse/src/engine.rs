//! # Emotion Engine
//!
//! Owns the classifier for the lifetime of the server.
//!
//! The classifier is built on first use: loaded from the model file when one
//! exists, otherwise trained from the CSV corpus on the blocking pool and
//! written back to disk. Concurrent first callers share one initialization;
//! a failed initialization leaves the engine cold so the next call retries.
//!
//! Predictions are memoized by normalized text.

use pulse_core::cache::PredictionCache;
use pulse_core::classifier::ClassifierError;
use pulse_core::corpus::{self, CorpusError};
use pulse_core::model::{self, ModelError, ModelFile};
use pulse_core::text::normalize;
use pulse_core::NaiveBayes;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::EngineConfig;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("corpus: {0}")]
    Corpus(#[from] CorpusError),

    #[error("model file: {0}")]
    Model(#[from] ModelError),

    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("training task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// =============================================================================
// LOADED MODEL
// =============================================================================

/// Where the live classifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Disk,
    Corpus,
}

/// A classifier ready to serve, with provenance.
#[derive(Debug)]
pub struct LoadedModel {
    pub classifier: NaiveBayes,
    pub rows: u64,
    pub source: ModelSource,
}

/// Reported by `GET /api/ai/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub ready: bool,
    pub rows: u64,
    pub labels: Vec<String>,
    pub source: Option<ModelSource>,
}

/// Train from the corpus and write the model file.
///
/// A failed write is logged and the freshly trained classifier is still
/// returned.
pub fn train_and_save(config: &EngineConfig) -> Result<LoadedModel, EngineError> {
    let (classifier, stats) = corpus::train_from_path(&config.corpus_path, config.train_limit)?;
    info!(
        rows = stats.rows_used,
        skipped = stats.rows_read.saturating_sub(stats.rows_used),
        labels = stats.labels.len(),
        "classifier trained"
    );

    let file = ModelFile::new(classifier, stats.rows_used);
    if let Err(err) = model::save(&config.model_path, &file) {
        warn!(error = %err, "could not write model file; continuing with in-memory model");
    }

    Ok(LoadedModel {
        classifier: file.classifier,
        rows: file.trained_rows,
        source: ModelSource::Corpus,
    })
}

/// Load the model file if present and readable, otherwise train.
pub fn load_or_train(config: &EngineConfig) -> Result<LoadedModel, EngineError> {
    if config.model_path.exists() {
        match model::load(&config.model_path) {
            Ok(file) => {
                info!(
                    path = %config.model_path.display(),
                    rows = file.trained_rows,
                    "classifier loaded from disk"
                );
                return Ok(LoadedModel {
                    classifier: file.classifier,
                    rows: file.trained_rows,
                    source: ModelSource::Disk,
                });
            }
            Err(err) => warn!(error = %err, "model file unusable, retraining from corpus"),
        }
    }
    train_and_save(config)
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct EmotionEngine {
    config: EngineConfig,
    model: OnceCell<Arc<LoadedModel>>,
    memo: Mutex<PredictionCache>,
}

impl std::fmt::Debug for EmotionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionEngine")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl EmotionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let memo = PredictionCache::new(config.memo_size);
        Self {
            config,
            model: OnceCell::new(),
            memo: Mutex::new(memo),
        }
    }

    /// Load or train the classifier once. Later calls return immediately.
    pub async fn ensure_ready(&self) -> Result<Arc<LoadedModel>, EngineError> {
        self.model
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let loaded = tokio::task::spawn_blocking(move || load_or_train(&config)).await??;
                Ok::<_, EngineError>(Arc::new(loaded))
            })
            .await
            .cloned()
    }

    /// Classify `text`, initializing the model if needed.
    pub async fn predict(&self, text: &str) -> Result<String, EngineError> {
        let key = normalize(text);
        if let Some(hit) = self.memo.lock().ok().and_then(|mut memo| memo.get(&key)) {
            return Ok(hit);
        }

        let loaded = self.ensure_ready().await?;
        let label = loaded.classifier.classify(&key)?;

        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(key, label.clone());
        }
        Ok(label)
    }

    /// Train from the corpus unconditionally and overwrite the model file.
    ///
    /// A running engine keeps serving the classifier it already has.
    pub async fn retrain(&self) -> Result<ModelStatus, EngineError> {
        let config = self.config.clone();
        let loaded = tokio::task::spawn_blocking(move || train_and_save(&config)).await??;
        Ok(status_of(Some(&loaded)))
    }

    pub fn status(&self) -> ModelStatus {
        status_of(self.model.get().map(Arc::as_ref))
    }

    pub fn is_ready(&self) -> bool {
        self.model.initialized()
    }
}

fn status_of(loaded: Option<&LoadedModel>) -> ModelStatus {
    match loaded {
        Some(model) => ModelStatus {
            ready: true,
            rows: model.rows,
            labels: model.classifier.labels().map(str::to_owned).collect(),
            source: Some(model.source),
        },
        None => ModelStatus {
            ready: false,
            rows: 0,
            labels: Vec::new(),
            source: None,
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # CLI Commands
//!
//! One function per subcommand. Each returns its result so tests can check
//! it without scraping stdout.

use chrono::{DateTime, Utc};
use pulse_core::classifier::ClassifierError;
use pulse_core::model::{self, ModelError};
use pulse_core::{FeedbackStore, MemoryStore, RedbStore, StoreCounts, StoreError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::api::{self, AppState};
use crate::auth::TokenKeys;
use crate::config::{Backend, ConfigError, EngineConfig, ServeArgs, StorageArgs};
use crate::engine::{self, EmotionEngine, EngineError, ModelStatus};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("model file: {0}")]
    Model(#[from] ModelError),

    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("model file {} already exists; pass --force to overwrite", .0.display())]
    ModelExists(PathBuf),

    #[error("json output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// STORE
// =============================================================================

pub fn open_store(args: &StorageArgs) -> Result<Arc<dyn FeedbackStore>, CliError> {
    Ok(match args.backend {
        Backend::Redb => {
            info!(path = %args.database.display(), "using redb store");
            Arc::new(RedbStore::open(&args.database)?)
        }
        Backend::Memory => {
            info!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    })
}

// =============================================================================
// SERVE
// =============================================================================

pub async fn cmd_serve(
    storage: &StorageArgs,
    engine: EngineConfig,
    args: ServeArgs,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    if config.admin.username.is_none() || config.admin.password.is_none() {
        tracing::warn!("ADMIN_USER/ADMIN_PASS not set; admin login is disabled");
    }

    let state = AppState::new(
        open_store(storage)?,
        Arc::new(EmotionEngine::new(engine)),
        TokenKeys::new(&config.jwt_secret),
        config.admin.clone(),
    );
    api::serve(state, &config).await?;
    Ok(())
}

// =============================================================================
// TRAIN / PREDICT
// =============================================================================

/// Train from the corpus and write the model file.
pub async fn cmd_train(config: &EngineConfig, force: bool) -> Result<ModelStatus, CliError> {
    if config.model_path.exists() && !force {
        return Err(CliError::ModelExists(config.model_path.clone()));
    }

    let status = EmotionEngine::new(config.clone()).retrain().await?;
    println!("Trained on {} rows", status.rows);
    println!("Labels: {}", status.labels.join(", "));
    println!("Model written to {}", config.model_path.display());
    Ok(status)
}

/// Classify `text` and print the label (or every label ranked, as JSON).
/// Returns the winning label.
pub fn cmd_predict(config: &EngineConfig, text: &str, json: bool) -> Result<String, CliError> {
    let loaded = engine::load_or_train(config)?;
    let ranked = loaded.classifier.classify_ranked(text)?;
    let best = ranked
        .first()
        .map(|r| r.label.clone())
        .ok_or(ClassifierError::NotTrained)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        println!("{best}");
    }
    Ok(best)
}

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ModelFileStatus {
    pub path: PathBuf,
    pub trained_rows: u64,
    pub trained_at: DateTime<Utc>,
    pub labels: Vec<String>,
    pub vocabulary: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub store: StoreCounts,
    /// `None` when no model file has been written yet.
    pub model: Option<ModelFileStatus>,
}

pub fn cmd_status(
    storage: &StorageArgs,
    config: &EngineConfig,
    json: bool,
) -> Result<StatusReport, CliError> {
    let store = open_store(storage)?;
    let report = StatusReport {
        store: store.counts()?,
        model: model_file_status(&config.model_path)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    println!("Users: {}", report.store.users);
    println!("Feedback: {}", report.store.feedback);
    match &report.model {
        Some(m) => {
            println!("Model: {}", m.path.display());
            println!("  trained on {} rows at {}", m.trained_rows, m.trained_at.to_rfc3339());
            println!("  labels: {}", m.labels.join(", "));
            println!("  vocabulary: {} tokens", m.vocabulary);
        }
        None => println!("Model: not trained ({})", config.model_path.display()),
    }
    Ok(report)
}

fn model_file_status(path: &Path) -> Result<Option<ModelFileStatus>, CliError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = model::load(path)?;
    Ok(Some(ModelFileStatus {
        path: path.to_path_buf(),
        trained_rows: file.trained_rows,
        trained_at: file.trained_at,
        labels: file.classifier.labels().map(str::to_owned).collect(),
        vocabulary: file.classifier.vocabulary_size(),
    }))
}

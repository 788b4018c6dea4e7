//! # Model Module
//!
//! On-disk snapshot of a trained classifier.
//!
//! The snapshot is a single JSON document so it can be inspected and
//! diffed by hand. Writes go to a sibling temporary file that is renamed
//! into place, so a crash mid-write never leaves a truncated model behind.

use crate::classifier::NaiveBayes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Current snapshot layout version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model file {path} has format version {found}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// A persisted classifier with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub format_version: u32,
    /// Corpus rows the classifier learned from.
    pub trained_rows: u64,
    pub trained_at: DateTime<Utc>,
    pub classifier: NaiveBayes,
}

impl ModelFile {
    /// Wrap a freshly trained classifier.
    #[must_use]
    pub fn new(classifier: NaiveBayes, trained_rows: u64) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            trained_rows,
            trained_at: Utc::now(),
            classifier,
        }
    }
}

/// Write a snapshot atomically, creating parent directories as needed.
pub fn save(path: &Path, model: &ModelFile) -> Result<(), ModelError> {
    let io_err = |source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let bytes = serde_json::to_vec(model).map_err(|source| ModelError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)?;

    info!(path = %path.display(), rows = model.trained_rows, "saved model");
    Ok(())
}

/// Read a snapshot written by [`save`].
pub fn load(path: &Path) -> Result<ModelFile, ModelError> {
    let bytes = fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let model: ModelFile = serde_json::from_slice(&bytes).map_err(|source| ModelError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    if model.format_version != FORMAT_VERSION {
        return Err(ModelError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: model.format_version,
            expected: FORMAT_VERSION,
        });
    }

    info!(path = %path.display(), rows = model.trained_rows, "loaded model");
    Ok(model)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "model".into());
    name.push(".tmp");
    path.with_file_name(name)
}

// =============================================================================
// TESTS
// =============================================================================

//! # Corpus Module
//!
//! Bootstraps a [`NaiveBayes`] classifier from a labelled CSV file.
//!
//! Column names vary between public emotion datasets, so the text and
//! label columns are picked from a list of known aliases. Header cells
//! are trimmed and a leading UTF-8 BOM is removed before matching.

use crate::classifier::NaiveBayes;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Accepted names for the text column, in priority order.
pub const TEXT_COLUMNS: &[&str] = &["text", "Text", "comment", "review", "message"];

/// Accepted names for the label column, in priority order.
pub const LABEL_COLUMNS: &[&str] = &["Emotion", "emotion", "label", "sentiment"];

/// Rows between progress log lines.
const PROGRESS_EVERY: u64 = 50_000;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to open corpus: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("corpus needs a text column and a label column; found {found:?}")]
    MissingColumns { found: Vec<String> },

    #[error("corpus contained no usable rows")]
    Empty,
}

/// What a training pass consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    /// CSV records read, including skipped ones.
    pub rows_read: u64,
    /// Records that were learned.
    pub rows_used: u64,
    /// Distinct normalized labels seen.
    pub labels: BTreeSet<String>,
}

/// Train a fresh classifier from a CSV file on disk.
pub fn train_from_path(
    path: &Path,
    limit: Option<u64>,
) -> Result<(NaiveBayes, CorpusStats), CorpusError> {
    info!(path = %path.display(), limit = limit.unwrap_or(0), "training from corpus");
    let file = File::open(path)?;
    train_from_csv(file, limit)
}

/// Train a fresh classifier from CSV data.
///
/// `limit` caps the number of *usable* rows; `None` or `Some(0)` reads the
/// whole input. Rows with a blank text or label are skipped.
pub fn train_from_csv<R: Read>(
    reader: R,
    limit: Option<u64>,
) -> Result<(NaiveBayes, CorpusStats), CorpusError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);

    let headers: Vec<String> = csv
        .byte_headers()?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_owned()
        })
        .collect();

    let (Some(text_idx), Some(label_idx)) = (
        find_column(&headers, TEXT_COLUMNS),
        find_column(&headers, LABEL_COLUMNS),
    ) else {
        return Err(CorpusError::MissingColumns { found: headers });
    };
    debug!(
        text = %headers[text_idx],
        label = %headers[label_idx],
        "corpus columns selected"
    );

    let cap = limit.filter(|&n| n > 0);
    let mut classifier = NaiveBayes::new();
    let mut stats = CorpusStats::default();

    for record in csv.byte_records() {
        let record = record?;
        stats.rows_read += 1;

        // Scraped datasets often carry Latin-1 bytes; keep the row.
        let text = field_lossy(&record, text_idx);
        let label = field_lossy(&record, label_idx);

        if classifier.add_document(&text, &label) {
            stats.rows_used += 1;
            stats.labels.insert(crate::text::normalize_label(&label));

            if stats.rows_used % PROGRESS_EVERY == 0 {
                info!(rows = stats.rows_used, "corpus progress");
            }
            if cap.is_some_and(|cap| stats.rows_used >= cap) {
                info!(rows = stats.rows_used, "row cap reached, stopping read");
                break;
            }
        }
    }

    if stats.rows_used == 0 {
        return Err(CorpusError::Empty);
    }

    info!(
        rows_read = stats.rows_read,
        rows_used = stats.rows_used,
        labels = stats.labels.len(),
        vocabulary = classifier.vocabulary_size(),
        "corpus training complete"
    );

    Ok((classifier, stats))
}

fn field_lossy(record: &csv::ByteRecord, idx: usize) -> Cow<'_, str> {
    String::from_utf8_lossy(record.get(idx).unwrap_or_default())
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

// =============================================================================
// TESTS
// =============================================================================

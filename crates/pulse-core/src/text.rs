//! # Text Module
//!
//! Normalization and tokenization shared by corpus training and inference.
//! Both paths must go through the same functions or the classifier will
//! score against a vocabulary it never saw.

/// Words too common to carry emotional signal.
///
/// Kept short on purpose: pronouns and negations ("not", "no", "never")
/// stay in because they shift emotion.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "been", "but", "by", "do", "for", "from",
    "had", "has", "have", "in", "into", "is", "it", "its", "of", "on", "or", "so", "than", "that",
    "the", "their", "them", "then", "there", "these", "this", "those", "to", "was", "were", "which",
    "while", "with",
];

/// Normalize free text.
///
/// Lowercases, replaces anything outside `[a-z0-9]` and whitespace with a
/// space, collapses whitespace runs and trims.
///
/// ```
/// use pulse_core::text::normalize;
///
/// assert_eq!(normalize("  I LOVED it!!  Great   job. "), "i loved it great job");
/// ```
#[must_use]
pub fn normalize(input: &str) -> String {
    let mapped: String = input
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize and split into feature tokens.
///
/// Drops stopwords and single-character tokens.
#[must_use]
pub fn tokenize(input: &str) -> Vec<String> {
    normalize(input)
        .split(' ')
        .filter(|t| t.len() > 1 && !is_stopword(t))
        .map(str::to_owned)
        .collect()
}

/// Normalize a class label: trimmed and lowercased.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

// =============================================================================
// TESTS
// =============================================================================

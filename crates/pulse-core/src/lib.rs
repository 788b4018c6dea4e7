//! # Pulse Core
//!
//! Domain logic for the Pulse feedback service.
//!
//! Users submit a star rating with a free-text comment; each comment is
//! tagged with an emotion label by a Naive Bayes classifier trained from a
//! labelled CSV corpus. Administrators read paginated feedback and an
//! aggregated summary.
//!
//! This crate is synchronous and network-free. The HTTP surface, token
//! auth and lazy model lifecycle live in the `pulse` application crate.
//!
//! ## Modules
//!
//! - [`text`]: normalization and tokenization shared by training and inference
//! - [`classifier`]: multinomial Naive Bayes over normalized tokens
//! - [`corpus`]: CSV ingestion into a classifier
//! - [`model`]: on-disk model snapshots
//! - [`validation`]: request input checks
//! - [`pagination`], [`analytics`]: list and dashboard shaping
//! - [`cache`]: LRU memo used for repeated predictions
//! - [`storage`]: the [`storage::FeedbackStore`] trait and its backends

pub mod analytics;
pub mod cache;
pub mod classifier;
pub mod corpus;
pub mod model;
pub mod pagination;
pub mod storage;
pub mod text;
pub mod validation;

pub use analytics::{EmotionCount, Summary, SummaryBuilder};
pub use classifier::{ClassifierError, NaiveBayes, RankedLabel};
pub use pagination::{Page, PageRequest};
pub use storage::{FeedbackFilter, FeedbackStore, MemoryStore, RedbStore, StoreCounts, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a registered user. Allocated by the store, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Identifier of a feedback entry. Allocated in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// RATING
// =============================================================================

/// A star rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a rating, returning `None` outside `1..=5`.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("rating {value} out of range 1..=5"))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A registered end user.
///
/// `email` is stored trimmed and lowercased; it is the login key and is
/// unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// PHC-formatted password hash. Never leaves the server.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Input for [`FeedbackStore::create_user`]. Fields are expected to be
/// validated and normalized already (see [`validation::SignupInput`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// A stored feedback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: String,
    /// Classifier label, `None` when classification was unavailable.
    pub emotion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`FeedbackStore::insert_feedback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: String,
    pub emotion: Option<String>,
}

// =============================================================================
// TESTS
// =============================================================================

//! # Storage Module
//!
//! Persistence for users and feedback behind the [`FeedbackStore`] trait.
//!
//! Two backends:
//! - [`MemoryStore`]: `RwLock` over `BTreeMap`s, for tests and throwaway runs
//! - [`RedbStore`]: redb embedded database with ACID transactions,
//!   copy-on-write B-trees and MVCC (concurrent readers, single writer)
//!
//! Both allocate ids in insertion order, so "newest first" is simply
//! descending id.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::analytics::Summary;
use crate::pagination::PageRequest;
use crate::{Feedback, NewFeedback, NewUser, User, UserId};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("database open failed: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction failed: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table open failed: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage failure: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit failed: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("record encoding failed: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("record has unknown encoding version {0}")]
    UnknownEncoding(u8),

    #[error("index points at missing record {0}")]
    DanglingIndex(u64),

    #[error("store lock poisoned")]
    Poisoned,
}

// =============================================================================
// QUERY TYPES
// =============================================================================

/// Admin list filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    /// Exact emotion label.
    pub emotion: Option<String>,
    /// Keep ratings greater than or equal to this.
    pub min_rating: Option<u8>,
}

impl FeedbackFilter {
    #[must_use]
    pub fn matches(&self, feedback: &Feedback) -> bool {
        let emotion_ok = self
            .emotion
            .as_deref()
            .is_none_or(|want| feedback.emotion.as_deref() == Some(want));
        let rating_ok = self
            .min_rating
            .is_none_or(|min| feedback.rating.get() >= min);
        emotion_ok && rating_ok
    }
}

/// Row counts reported by `pulse status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub users: u64,
    pub feedback: u64,
}

// =============================================================================
// FEEDBACKSTORE TRAIT
// =============================================================================

/// User and feedback persistence.
///
/// Every method takes `&self`; implementations synchronize internally so a
/// single instance can be shared across request handlers.
pub trait FeedbackStore: Send + Sync {
    /// Register a user. Fails with [`StoreError::EmailTaken`] if the
    /// (already normalized) email exists.
    fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Resolve several users at once. Unknown ids are left out.
    fn users_by_ids(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, User>, StoreError> {
        let mut found = BTreeMap::new();
        for &id in ids {
            if let Some(user) = self.user_by_id(id)? {
                found.insert(id, user);
            }
        }
        Ok(found)
    }

    /// Store feedback, stamping id and timestamps.
    fn insert_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError>;

    /// All feedback by one user, newest first.
    fn feedback_for_user(&self, user: UserId) -> Result<Vec<Feedback>, StoreError>;

    /// One page of matching feedback, newest first, with the total match count.
    fn query_feedback(
        &self,
        filter: &FeedbackFilter,
        page: PageRequest,
    ) -> Result<(Vec<Feedback>, u64), StoreError>;

    /// Aggregate over all stored feedback.
    fn summary(&self) -> Result<Summary, StoreError>;

    fn counts(&self) -> Result<StoreCounts, StoreError>;
}

// =============================================================================
// TESTS
// =============================================================================

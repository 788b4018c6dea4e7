//! redb-backed [`FeedbackStore`].
//!
//! Records are postcard-encoded behind a one-byte version prefix so the
//! layout can evolve without a migration pass over old rows.

use super::{FeedbackFilter, FeedbackStore, StoreCounts, StoreError};
use crate::analytics::{Summary, SummaryBuilder};
use crate::pagination::PageRequest;
use crate::{Feedback, FeedbackId, NewFeedback, NewUser, User, UserId};
use chrono::Utc;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

// =============================================================================
// TABLE DEFINITIONS
// =============================================================================

/// user id -> encoded [`User`]
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
/// normalized email -> user id
const USERS_BY_EMAIL: TableDefinition<&str, u64> = TableDefinition::new("users_by_email");
/// feedback id -> encoded [`Feedback`]
const FEEDBACK: TableDefinition<u64, &[u8]> = TableDefinition::new("feedback");
/// (user id, feedback id) -> ()
const FEEDBACK_BY_USER: TableDefinition<(u64, u64), ()> = TableDefinition::new("feedback_by_user");
/// sequence name -> next id
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_USER_ID: &str = "next_user_id";
const NEXT_FEEDBACK_ID: &str = "next_feedback_id";

/// Prefix byte of every encoded record.
const RECORD_VERSION: u8 = 1;

// =============================================================================
// STORE
// =============================================================================

pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!(path = %path.display(), "opening redb store");
        Self::init(Database::create(path)?)
    }

    /// A redb database held entirely in memory.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Database::builder().create_with_backend(InMemoryBackend::new())?)
    }

    /// Create every table up front so read transactions never hit a
    /// missing table.
    fn init(db: Database) -> Result<Self, StoreError> {
        let txn = db.begin_write()?;
        {
            txn.open_table(USERS)?;
            txn.open_table(USERS_BY_EMAIL)?;
            txn.open_table(FEEDBACK)?;
            txn.open_table(FEEDBACK_BY_USER)?;
            txn.open_table(META)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }
}

impl FeedbackStore for RedbStore {
    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let txn = self.db.begin_write()?;
        let created = {
            let mut emails = txn.open_table(USERS_BY_EMAIL)?;
            if emails.get(user.email.as_str())?.is_some() {
                return Err(StoreError::EmailTaken);
            }

            let id = next_id(&txn, NEXT_USER_ID)?;
            let created = User {
                id: UserId(id),
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                created_at: Utc::now(),
            };

            let mut users = txn.open_table(USERS)?;
            users.insert(id, encode(&created)?.as_slice())?;
            emails.insert(created.email.as_str(), id)?;
            created
        };
        txn.commit()?;
        Ok(created)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let emails = txn.open_table(USERS_BY_EMAIL)?;
        let Some(id) = emails.get(email)?.map(|g| g.value()) else {
            return Ok(None);
        };

        let users = txn.open_table(USERS)?;
        let guard = users.get(id)?.ok_or(StoreError::DanglingIndex(id))?;
        decode(guard.value()).map(Some)
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        match users.get(id.0)? {
            Some(guard) => decode(guard.value()).map(Some),
            None => Ok(None),
        }
    }

    fn users_by_ids(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        let mut found = BTreeMap::new();
        for &id in ids {
            if let Some(guard) = users.get(id.0)? {
                found.insert(id, decode(guard.value())?);
            }
        }
        Ok(found)
    }

    fn insert_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError> {
        let txn = self.db.begin_write()?;
        let created = {
            let id = next_id(&txn, NEXT_FEEDBACK_ID)?;
            let now = Utc::now();
            let created = Feedback {
                id: FeedbackId(id),
                user_id: feedback.user_id,
                rating: feedback.rating,
                comment: feedback.comment,
                emotion: feedback.emotion,
                created_at: now,
                updated_at: now,
            };

            let mut table = txn.open_table(FEEDBACK)?;
            table.insert(id, encode(&created)?.as_slice())?;
            let mut by_user = txn.open_table(FEEDBACK_BY_USER)?;
            by_user.insert((created.user_id.0, id), ())?;
            created
        };
        txn.commit()?;
        Ok(created)
    }

    fn feedback_for_user(&self, user: UserId) -> Result<Vec<Feedback>, StoreError> {
        let txn = self.db.begin_read()?;
        let by_user = txn.open_table(FEEDBACK_BY_USER)?;
        let table = txn.open_table(FEEDBACK)?;

        let mut items = Vec::new();
        for entry in by_user.range((user.0, 0)..=(user.0, u64::MAX))?.rev() {
            let (key, _) = entry?;
            let (_, id) = key.value();
            let guard = table.get(id)?.ok_or(StoreError::DanglingIndex(id))?;
            items.push(decode(guard.value())?);
        }
        Ok(items)
    }

    fn query_feedback(
        &self,
        filter: &FeedbackFilter,
        page: PageRequest,
    ) -> Result<(Vec<Feedback>, u64), StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FEEDBACK)?;

        let mut total = 0u64;
        let mut items = Vec::new();
        for entry in table.iter()?.rev() {
            let (_, value) = entry?;
            let feedback: Feedback = decode(value.value())?;
            if !filter.matches(&feedback) {
                continue;
            }
            if total >= page.offset() && (items.len() as u64) < page.limit() {
                items.push(feedback);
            }
            total += 1;
        }
        Ok((items, total))
    }

    fn summary(&self) -> Result<Summary, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FEEDBACK)?;

        let mut builder = SummaryBuilder::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            builder.add(&decode(value.value())?);
        }
        Ok(builder.finish())
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        let txn = self.db.begin_read()?;
        Ok(StoreCounts {
            users: txn.open_table(USERS)?.len()?,
            feedback: txn.open_table(FEEDBACK)?.len()?,
        })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Allocate the next id from a named sequence. Sequences start at 1.
fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64, StoreError> {
    let mut meta = txn.open_table(META)?;
    let next = meta.get(sequence)?.map(|g| g.value()).unwrap_or(1);
    meta.insert(sequence, next + 1)?;
    Ok(next)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut bytes = vec![RECORD_VERSION];
    bytes.extend_from_slice(&postcard::to_allocvec(value)?);
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    match bytes.split_first() {
        Some((&RECORD_VERSION, body)) => Ok(postcard::from_bytes(body)?),
        Some((&version, _)) => Err(StoreError::UnknownEncoding(version)),
        None => Err(StoreError::UnknownEncoding(0)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::conformance;
    use super::*;
    use crate::Rating;

    #[test]
    fn users_are_unique_by_email() {
        conformance::users_are_unique_by_email(&RedbStore::in_memory().unwrap());
    }

    #[test]
    fn feedback_lists_newest_first() {
        conformance::feedback_lists_newest_first(&RedbStore::in_memory().unwrap());
    }

    #[test]
    fn query_filters_and_paginates() {
        conformance::query_filters_and_paginates(&RedbStore::in_memory().unwrap());
    }

    #[test]
    fn summary_and_counts() {
        conformance::summary_and_counts(&RedbStore::in_memory().unwrap());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.redb");

        let user = {
            let store = RedbStore::open(&path).unwrap();
            let user = store
                .create_user(NewUser {
                    name: "Ada".into(),
                    email: "ada@example.com".into(),
                    password_hash: "hash".into(),
                })
                .unwrap();
            store
                .insert_feedback(NewFeedback {
                    user_id: user.id,
                    rating: Rating::new(4).unwrap(),
                    comment: "solid".into(),
                    emotion: Some("joy".into()),
                })
                .unwrap();
            user
        };

        let reopened = RedbStore::open(&path).unwrap();
        assert_eq!(reopened.user_by_email("ada@example.com").unwrap(), Some(user.clone()));
        let feedback = reopened.feedback_for_user(user.id).unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].emotion.as_deref(), Some("joy"));

        // Sequences continue where they left off.
        let next = reopened
            .create_user(NewUser {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                password_hash: "hash".into(),
            })
            .unwrap();
        assert_eq!(next.id, UserId(2));
    }

    #[test]
    fn unknown_record_version_is_rejected() {
        let result: Result<User, _> = decode(&[9, 1, 2, 3]);
        assert!(matches!(result, Err(StoreError::UnknownEncoding(9))));
        let empty: Result<User, _> = decode(&[]);
        assert!(empty.is_err());
    }
}

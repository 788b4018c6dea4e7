//! In-memory [`FeedbackStore`]. Nothing survives a restart.

use super::{FeedbackFilter, FeedbackStore, StoreCounts, StoreError};
use crate::analytics::{Summary, SummaryBuilder};
use crate::pagination::PageRequest;
use crate::{Feedback, FeedbackId, NewFeedback, NewUser, User, UserId};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    emails: BTreeMap<String, UserId>,
    feedback: BTreeMap<FeedbackId, Feedback>,
    by_user: BTreeMap<UserId, Vec<FeedbackId>>,
    last_user: u64,
    last_feedback: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl FeedbackStore for MemoryStore {
    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.write()?;
        if inner.emails.contains_key(&user.email) {
            return Err(StoreError::EmailTaken);
        }

        inner.last_user += 1;
        let user = User {
            id: UserId(inner.last_user),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        inner.emails.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn insert_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError> {
        let mut inner = self.write()?;
        inner.last_feedback += 1;
        let now = Utc::now();
        let feedback = Feedback {
            id: FeedbackId(inner.last_feedback),
            user_id: feedback.user_id,
            rating: feedback.rating,
            comment: feedback.comment,
            emotion: feedback.emotion,
            created_at: now,
            updated_at: now,
        };
        inner
            .by_user
            .entry(feedback.user_id)
            .or_default()
            .push(feedback.id);
        inner.feedback.insert(feedback.id, feedback.clone());
        Ok(feedback)
    }

    fn feedback_for_user(&self, user: UserId) -> Result<Vec<Feedback>, StoreError> {
        let inner = self.read()?;
        let Some(ids) = inner.by_user.get(&user) else {
            return Ok(Vec::new());
        };
        ids.iter()
            .rev()
            .map(|id| {
                inner
                    .feedback
                    .get(id)
                    .cloned()
                    .ok_or(StoreError::DanglingIndex(id.0))
            })
            .collect()
    }

    fn query_feedback(
        &self,
        filter: &FeedbackFilter,
        page: PageRequest,
    ) -> Result<(Vec<Feedback>, u64), StoreError> {
        let inner = self.read()?;
        let mut total = 0u64;
        let mut items = Vec::new();

        for feedback in inner.feedback.values().rev().filter(|f| filter.matches(f)) {
            if total >= page.offset() && (items.len() as u64) < page.limit() {
                items.push(feedback.clone());
            }
            total += 1;
        }

        Ok((items, total))
    }

    fn summary(&self) -> Result<Summary, StoreError> {
        let inner = self.read()?;
        let mut builder = SummaryBuilder::new();
        for feedback in inner.feedback.values() {
            builder.add(feedback);
        }
        Ok(builder.finish())
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        let inner = self.read()?;
        Ok(StoreCounts {
            users: inner.users.len() as u64,
            feedback: inner.feedback.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::conformance;
    use super::*;

    #[test]
    fn users_are_unique_by_email() {
        conformance::users_are_unique_by_email(&MemoryStore::new());
    }

    #[test]
    fn feedback_lists_newest_first() {
        conformance::feedback_lists_newest_first(&MemoryStore::new());
    }

    #[test]
    fn query_filters_and_paginates() {
        conformance::query_filters_and_paginates(&MemoryStore::new());
    }

    #[test]
    fn summary_and_counts() {
        conformance::summary_and_counts(&MemoryStore::new());
    }
}

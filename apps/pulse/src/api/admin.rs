//! Administrator login, the filtered feedback table and the dashboard
//! summary.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use pulse_core::text::normalize_label;
use pulse_core::validation::AdminLoginInput;
use pulse_core::{FeedbackFilter, Page, PageRequest, Summary, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{info, warn};

use super::feedback::FeedbackView;
use super::{ApiError, AppState};
use crate::auth::{AdminSession, admin_credentials_match};

#[derive(Debug, Serialize)]
pub struct AdminIdentity {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AdminSessionResponse {
    pub token: String,
    pub admin: AdminIdentity,
}

/// Query string of `GET /api/admin/feedback`. Values are taken leniently:
/// blank or unparsable fields fall back to their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFeedbackQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub emotion: Option<String>,
    pub min_rating: Option<String>,
}

impl AdminFeedbackQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(parse_opt(self.page.as_deref()), parse_opt(self.limit.as_deref()))
    }

    fn filter(&self) -> FeedbackFilter {
        FeedbackFilter {
            emotion: self
                .emotion
                .as_deref()
                .map(normalize_label)
                .filter(|e| !e.is_empty()),
            min_rating: parse_opt(self.min_rating.as_deref()),
        }
    }
}

fn parse_opt<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

#[derive(Debug, Serialize)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A feedback row with its author inlined; `user` is null when the
/// account no longer exists.
#[derive(Debug, Serialize)]
pub struct AdminFeedbackItem {
    #[serde(flatten)]
    pub feedback: FeedbackView,
    pub user: Option<UserRef>,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<AdminLoginInput>, JsonRejection>,
) -> Result<Json<AdminSessionResponse>, ApiError> {
    let Json(input) = payload?;
    // A missing field is reported the same as a wrong one.
    let Ok((username, password)) = input.validate() else {
        warn!("admin login rejected: missing fields");
        return Err(ApiError::InvalidAdminCredentials);
    };

    if !admin_credentials_match(&state.admin, &username, &password) {
        warn!("admin login rejected");
        return Err(ApiError::InvalidAdminCredentials);
    }

    let token = state.tokens.issue_admin()?;
    info!("admin session issued");
    Ok(Json(AdminSessionResponse {
        token,
        admin: AdminIdentity { username },
    }))
}

pub async fn list_feedback(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<AdminFeedbackQuery>,
) -> Result<Json<Page<AdminFeedbackItem>>, ApiError> {
    let request = query.page_request();
    let (items, total) = state.store.query_feedback(&query.filter(), request)?;

    let author_ids: Vec<UserId> = items
        .iter()
        .map(|f| f.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let authors = state.store.users_by_ids(&author_ids)?;

    let page = Page::new(items, total, request).map(|feedback| AdminFeedbackItem {
        user: authors.get(&feedback.user_id).map(UserRef::from),
        feedback: feedback.into(),
    });
    Ok(Json(page))
}

pub async fn summary(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Summary>, ApiError> {
    Ok(Json(state.store.summary()?))
}

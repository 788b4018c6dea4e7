//! Feedback submission and the submitter's own history.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use pulse_core::validation::FeedbackInput;
use pulse_core::{Feedback, FeedbackId, NewFeedback, UserId};
use serde::Serialize;
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::auth::AuthUser;

/// Full feedback record as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    #[serde(rename = "_id")]
    pub id: FeedbackId,
    pub user_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub emotion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Feedback> for FeedbackView {
    fn from(f: Feedback) -> Self {
        Self {
            id: f.id,
            user_id: f.user_id,
            rating: f.rating.get(),
            comment: f.comment,
            emotion: f.emotion,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

/// Trimmed entry for the "my feedback" list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnFeedback {
    #[serde(rename = "_id")]
    pub id: FeedbackId,
    pub rating: u8,
    pub comment: String,
    pub emotion: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Feedback> for OwnFeedback {
    fn from(f: Feedback) -> Self {
        Self {
            id: f.id,
            rating: f.rating.get(),
            comment: f.comment,
            emotion: f.emotion,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedFeedback {
    pub feedback: FeedbackView,
}

#[derive(Debug, Serialize)]
pub struct FeedbackList {
    pub feedback: Vec<OwnFeedback>,
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<FeedbackInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedFeedback>), ApiError> {
    let Json(input) = payload?;
    let valid = input.validate()?;

    let emotion = match state.engine.predict(&valid.comment).await {
        Ok(label) => Some(label),
        Err(err) => {
            warn!(error = %err, "classification unavailable; storing feedback without emotion");
            None
        }
    };

    let feedback = state.store.insert_feedback(NewFeedback {
        user_id: user,
        rating: valid.rating,
        comment: valid.comment,
        emotion,
    })?;
    info!(
        feedback = %feedback.id,
        user = %user,
        emotion = feedback.emotion.as_deref().unwrap_or("-"),
        "feedback stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedFeedback {
            feedback: feedback.into(),
        }),
    ))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<FeedbackList>, ApiError> {
    let feedback = state
        .store
        .feedback_for_user(user)?
        .into_iter()
        .map(OwnFeedback::from)
        .collect();
    Ok(Json(FeedbackList { feedback }))
}

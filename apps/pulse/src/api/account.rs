//! Signup, login and the current-user lookup.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use pulse_core::validation::{LoginInput, SignupInput};
use pulse_core::{NewUser, User, UserId};
use serde::Serialize;
use tracing::info;

use super::{ApiError, AppState};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::AuthUser;

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Profile,
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupInput>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let Json(input) = payload?;
    let valid = input.validate()?;

    // Fail fast before paying for a hash; create_user still enforces it.
    if state.store.user_by_email(&valid.email)?.is_some() {
        return Err(ApiError::EmailTaken);
    }

    let password_hash = hash_password_blocking(valid.password).await?;
    let user = state.store.create_user(NewUser {
        name: valid.name,
        email: valid.email,
        password_hash,
    })?;
    let token = state.tokens.issue_user(user.id)?;
    info!(user = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(input) = payload?;
    let valid = input.validate()?;

    let user = state
        .store
        .user_by_email(&valid.email)?
        .ok_or(ApiError::InvalidCredentials)?;
    if !verify_password_blocking(valid.password, user.password_hash.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue_user(user.id)?;
    Ok(Json(SessionResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .store
        .user_by_id(id)?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(ProfileResponse {
        user: Profile {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        },
    }))
}

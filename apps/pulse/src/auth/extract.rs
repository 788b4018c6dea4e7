//! Bearer-token extractors.
//!
//! Put [`AuthUser`] or [`AdminSession`] in a handler signature to require a
//! valid session of that role. Rejections are [`ApiError`]s:
//! missing header is 401 `Unauthorized`, a bad or expired token is 401
//! `Invalid or expired token`, the wrong role is 403 `Forbidden`.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use pulse_core::UserId;
use tracing::debug;

use super::token::{Claims, Role};
use crate::api::{ApiError, AppState};

/// An authenticated end user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// An authenticated administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminSession;

fn bearer_claims(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    state.tokens.verify(token).map_err(|err| {
        debug!(error = %err, "rejected bearer token");
        ApiError::InvalidToken
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        if claims.role != Role::User {
            return Err(ApiError::Forbidden);
        }
        claims
            .sub
            .as_deref()
            .and_then(|sub| sub.parse().ok())
            .map(|id| Self(UserId(id)))
            .ok_or(ApiError::InvalidToken)
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_claims(parts, state)?.role {
            Role::Admin => Ok(Self),
            Role::User => Err(ApiError::Forbidden),
        }
    }
}

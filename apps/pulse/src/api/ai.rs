//! Classifier endpoints: warmup, status and ad-hoc prediction.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use pulse_core::validation::PredictInput;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use super::{ApiError, AppState};
use crate::engine::ModelStatus;

#[derive(Debug, Serialize)]
pub struct Prediction {
    pub emotion: String,
}

pub async fn warmup(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.engine.ensure_ready().await.map_err(|err| {
        warn!(error = %err, "model warmup failed");
        ApiError::ModelUnavailable
    })?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(state.engine.status())
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictInput>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let Json(input) = payload?;
    let text = input.validate()?;
    let emotion = state.engine.predict(&text).await.map_err(|err| {
        warn!(error = %err, "prediction failed");
        ApiError::ModelUnavailable
    })?;
    Ok(Json(Prediction { emotion }))
}

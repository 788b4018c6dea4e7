//! # HTTP API
//!
//! JSON API served by axum. All routes live under `/api`; error bodies are
//! `{"message": "..."}`.
//!
//! | Route                     | Auth  |
//! |---------------------------|-------|
//! | `GET  /api/health`        | -     |
//! | `POST /api/auth/signup`   | -     |
//! | `POST /api/auth/login`    | - (rate limited per IP) |
//! | `GET  /api/auth/me`       | user  |
//! | `POST /api/feedback`      | user  |
//! | `GET  /api/feedback/me`   | user  |
//! | `POST /api/admin/login`   | - (rate limited per IP) |
//! | `GET  /api/admin/feedback`| admin |
//! | `GET  /api/admin/summary` | admin |
//! | `GET  /api/ai/warmup`     | -     |
//! | `GET  /api/ai/status`     | -     |
//! | `POST /api/ai/predict`    | -     |

mod account;
mod admin;
mod ai;
mod error;
mod feedback;
pub mod rate_limit;

pub use error::ApiError;

use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use chrono::Utc;
use pulse_core::FeedbackStore;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::auth::TokenKeys;
use crate::config::{AdminCredentials, HttpConfig, ServerConfig};
use crate::engine::EmotionEngine;

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeedbackStore>,
    pub engine: Arc<EmotionEngine>,
    pub tokens: Arc<TokenKeys>,
    pub admin: Arc<AdminCredentials>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        engine: Arc<EmotionEngine>,
        tokens: TokenKeys,
        admin: AdminCredentials,
    ) -> Self {
        Self {
            store,
            engine,
            tokens: Arc::new(tokens),
            admin: Arc::new(admin),
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

pub fn router(state: AppState, http: &HttpConfig) -> Router {
    let limiter = rate_limit::login_limiter(http.login_rate);
    let logins = Router::new()
        .route("/api/auth/login", post(account::login))
        .route("/api/admin/login", post(admin::login))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::limit_logins));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/signup", post(account::signup))
        .route("/api/auth/me", get(account::me))
        .route("/api/feedback", post(feedback::create))
        .route("/api/feedback/me", get(feedback::mine))
        .route("/api/admin/feedback", get(admin::list_feedback))
        .route("/api/admin/summary", get(admin::summary))
        .route("/api/ai/warmup", get(ai::warmup))
        .route("/api/ai/status", get(ai::status))
        .route("/api/ai/predict", post(ai::predict))
        .merge(logins)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(http)),
        )
        .with_state(state)
}

fn cors_layer(http: &HttpConfig) -> CorsLayer {
    match &http.client_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        None => CorsLayer::permissive(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "time": Utc::now().to_rfc3339() }))
}

// =============================================================================
// SERVER
// =============================================================================

/// Bind, start model warmup in the background, and serve until Ctrl-C or
/// SIGTERM.
pub async fn serve(state: AppState, config: &ServerConfig) -> std::io::Result<()> {
    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        match engine.ensure_ready().await {
            Ok(model) => info!(rows = model.rows, "emotion model ready"),
            Err(err) => warn!(error = %err, "emotion model warmup failed; will retry on demand"),
        }
    });

    let app = router(state, &config.http);
    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "pulse listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

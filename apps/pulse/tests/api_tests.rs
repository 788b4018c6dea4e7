//! Integration tests for the HTTP API.
//!
//! Runs the full router in-process with axum-test against an in-memory
//! store and a tiny corpus written to a temp directory.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, ORIGIN,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use pulse::api::{self, AppState};
use pulse::auth::TokenKeys;
use pulse::config::{AdminCredentials, EngineConfig, HttpConfig, RateLimitConfig};
use pulse::engine::EmotionEngine;
use pulse_core::MemoryStore;
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

const CORPUS: &str = "text,Emotion\n\
    i love this wonderful product,joy\n\
    so happy with the great service,joy\n\
    amazing experience loved every minute,joy\n\
    this is terrible and makes me furious,anger\n\
    i hate the rude staff angry,anger\n\
    i am scared the device will explode,fear\n\
    frightened by the noise,fear\n";

struct Harness {
    server: TestServer,
    _dir: TempDir,
}

fn engine_config(dir: &TempDir, with_corpus: bool) -> EngineConfig {
    let corpus_path = dir.path().join("corpus.csv");
    if with_corpus {
        std::fs::write(&corpus_path, CORPUS).unwrap();
    }
    EngineConfig {
        corpus_path,
        model_path: dir.path().join("classifier.json"),
        train_limit: None,
        memo_size: 32,
    }
}

fn harness_with(with_corpus: bool, http: HttpConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(EmotionEngine::new(engine_config(&dir, with_corpus))),
        TokenKeys::new("test-secret"),
        AdminCredentials {
            username: Some("admin".into()),
            password: Some("letmein".into()),
        },
    );
    Harness {
        server: TestServer::new(api::router(state, &http)).unwrap(),
        _dir: dir,
    }
}

fn harness() -> Harness {
    harness_with(true, HttpConfig::default())
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

async fn signup(server: &TestServer, name: &str, email: &str) -> String {
    let response = server
        .post("/api/auth/signup")
        .json(&json!({ "name": name, "email": email, "password": "secret" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["token"].as_str().unwrap().to_owned()
}

async fn admin_token(server: &TestServer) -> String {
    let response = server
        .post("/api/admin/login")
        .json(&json!({ "username": "admin", "password": "letmein" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()["token"].as_str().unwrap().to_owned()
}

async fn submit(server: &TestServer, token: &str, rating: Value, comment: &str) -> Value {
    let response = server
        .post("/api/feedback")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "rating": rating, "comment": comment }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["feedback"].clone()
}

// =============================================================================
// HEALTH
// =============================================================================

#[tokio::test]
async fn test_health() {
    let h = harness();
    let body = h.server.get("/api/health").await.json::<Value>();
    assert_eq!(body["ok"], true);
    assert!(body["time"].is_string());
}

// =============================================================================
// ACCOUNT TESTS
// =============================================================================

#[tokio::test]
async fn test_signup_returns_token_and_user() {
    let h = harness();
    let response = h
        .server
        .post("/api/auth/signup")
        .json(&json!({ "name": "  Ada ", "email": " Ada@Example.com ", "password": "secret" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body = response.json::<Value>();
    assert!(body["token"].as_str().unwrap().split('.').count() == 3);
    assert_eq!(body["user"]["id"], 1);
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_validation_and_conflict() {
    let h = harness();

    let missing = h
        .server
        .post("/api/auth/signup")
        .json(&json!({ "name": "Ada", "email": "ada@example.com" }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>()["message"], "All fields required");

    let bad_email = h
        .server
        .post("/api/auth/signup")
        .json(&json!({ "name": "Ada", "email": "not-an-email", "password": "secret" }))
        .await;
    assert_eq!(bad_email.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.json::<Value>()["message"], "Enter a valid email");

    signup(&h.server, "Ada", "ada@example.com").await;
    let dup = h
        .server
        .post("/api/auth/signup")
        .json(&json!({ "name": "Other", "email": "ADA@example.com", "password": "secret" }))
        .await;
    assert_eq!(dup.status_code(), StatusCode::CONFLICT);
    assert_eq!(dup.json::<Value>()["message"], "Email already registered");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = harness();
    let response = h
        .server
        .post("/api/auth/login")
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["message"].is_string());
}

#[tokio::test]
async fn test_login() {
    let h = harness();
    signup(&h.server, "Ada", "ada@example.com").await;

    let ok = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ADA@example.com", "password": "secret" }))
        .await;
    assert_eq!(ok.status_code(), StatusCode::OK);
    assert_eq!(ok.json::<Value>()["user"]["email"], "ada@example.com");

    let wrong = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": "nope" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["message"], "Invalid credentials");

    let unknown = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ghost@example.com", "password": "secret" }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);

    let blank = h
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "", "password": "" }))
        .await;
    assert_eq!(blank.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(blank.json::<Value>()["message"], "Email and password required");
}

#[tokio::test]
async fn test_me() {
    let h = harness();
    let token = signup(&h.server, "Ada", "ada@example.com").await;

    let response = h
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let user = &response.json::<Value>()["user"];
    assert_eq!(user["_id"], 1);
    assert_eq!(user["name"], "Ada");
    assert!(user["createdAt"].is_string());
}

#[tokio::test]
async fn test_me_for_unknown_user_is_not_found() {
    let h = harness();
    let token = TokenKeys::new("test-secret")
        .issue_user(pulse_core::UserId(404))
        .unwrap();
    let response = h
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// =============================================================================
// AUTH GUARD TESTS
// =============================================================================

#[tokio::test]
async fn test_guards() {
    let h = harness();

    let missing = h.server.get("/api/feedback/me").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json::<Value>()["message"], "Unauthorized");

    let garbage = h
        .server
        .get("/api/feedback/me")
        .add_header(AUTHORIZATION, bearer("abc.def.ghi"))
        .await;
    assert_eq!(garbage.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.json::<Value>()["message"], "Invalid or expired token");

    let foreign = TokenKeys::new("other-secret")
        .issue_user(pulse_core::UserId(1))
        .unwrap();
    let forged = h
        .server
        .get("/api/feedback/me")
        .add_header(AUTHORIZATION, bearer(&foreign))
        .await;
    assert_eq!(forged.status_code(), StatusCode::UNAUTHORIZED);

    let user_token = signup(&h.server, "Ada", "ada@example.com").await;
    let as_user = h
        .server
        .get("/api/admin/summary")
        .add_header(AUTHORIZATION, bearer(&user_token))
        .await;
    assert_eq!(as_user.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(as_user.json::<Value>()["message"], "Forbidden");

    let admin = admin_token(&h.server).await;
    let as_admin = h
        .server
        .get("/api/feedback/me")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(as_admin.status_code(), StatusCode::FORBIDDEN);
}

// =============================================================================
// FEEDBACK TESTS
// =============================================================================

#[tokio::test]
async fn test_feedback_is_classified_and_listed_newest_first() {
    let h = harness();
    let token = signup(&h.server, "Ada", "ada@example.com").await;

    let first = submit(&h.server, &token, json!(5), "I love this wonderful product!").await;
    assert_eq!(first["emotion"], "joy");
    assert_eq!(first["rating"], 5);
    assert_eq!(first["userId"], 1);
    assert!(first["_id"].is_number());

    let second = submit(&h.server, &token, json!("1"), "  Rude staff, I am furious  ").await;
    assert_eq!(second["emotion"], "anger");
    assert_eq!(second["comment"], "Rude staff, I am furious");
    assert_eq!(second["rating"], 1);

    let list = h
        .server
        .get("/api/feedback/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json::<Value>();
    let items = list["feedback"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["_id"], second["_id"]);
    assert_eq!(items[1]["_id"], first["_id"]);
    assert!(items[0].get("userId").is_none());
    assert!(items[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_feedback_validation() {
    let h = harness();
    let token = signup(&h.server, "Ada", "ada@example.com").await;

    for body in [
        json!({ "rating": 0, "comment": "hi" }),
        json!({ "rating": 6, "comment": "hi" }),
        json!({ "rating": 3.5, "comment": "hi" }),
        json!({ "rating": 3, "comment": "   " }),
        json!({ "comment": "hi" }),
    ] {
        let response = h
            .server
            .post("/api/feedback")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&body)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn test_feedback_without_model_is_stored_unclassified() {
    let h = harness_with(false, HttpConfig::default());
    let token = signup(&h.server, "Ada", "ada@example.com").await;

    let feedback = submit(&h.server, &token, json!(4), "decent enough").await;
    assert!(feedback["emotion"].is_null());

    let predict = h
        .server
        .post("/api/ai/predict")
        .json(&json!({ "text": "hello" }))
        .await;
    assert_eq!(predict.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(predict.json::<Value>()["message"], "Model not ready");

    let warmup = h.server.get("/api/ai/warmup").await;
    assert_eq!(warmup.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// ADMIN TESTS
// =============================================================================

#[tokio::test]
async fn test_admin_login() {
    let h = harness();

    let response = h
        .server
        .post("/api/admin/login")
        .json(&json!({ "username": "admin", "password": "letmein" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["admin"]["username"], "admin");

    let wrong = h
        .server
        .post("/api/admin/login")
        .json(&json!({ "username": "admin", "password": "guess" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["message"], "Invalid admin credentials");

    let blank = h
        .server
        .post("/api/admin/login")
        .json(&json!({}))
        .await;
    assert_eq!(blank.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(blank.json::<Value>()["message"], "Invalid admin credentials");

    let no_password = h
        .server
        .post("/api/admin/login")
        .json(&json!({ "username": "admin" }))
        .await;
    assert_eq!(no_password.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(no_password.json::<Value>()["message"], "Invalid admin credentials");
}

#[tokio::test]
async fn test_admin_feedback_filters_and_pages() {
    let h = harness();
    let ada = signup(&h.server, "Ada", "ada@example.com").await;
    let bob = signup(&h.server, "Bob", "bob@example.com").await;

    submit(&h.server, &ada, json!(5), "i love this wonderful product").await;
    submit(&h.server, &bob, json!(2), "rude staff i am furious").await;
    submit(&h.server, &ada, json!(4), "so happy with the great service").await;
    submit(&h.server, &bob, json!(1), "terrible and angry").await;

    let admin = admin_token(&h.server).await;

    let all = h
        .server
        .get("/api/admin/feedback")
        .add_header(AUTHORIZATION, bearer(&admin))
        .add_query_param("limit", 3)
        .await
        .json::<Value>();
    assert_eq!(all["total"], 4);
    assert_eq!(all["page"], 1);
    assert_eq!(all["limit"], 3);
    assert_eq!(all["pages"], 2);
    let items = all["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["user"]["name"], "Bob");
    assert_eq!(items[0]["user"]["_id"], 2);
    assert!(items[0]["user"].get("password_hash").is_none());

    let joy = h
        .server
        .get("/api/admin/feedback")
        .add_header(AUTHORIZATION, bearer(&admin))
        .add_query_param("emotion", "joy")
        .add_query_param("minRating", 5)
        .await
        .json::<Value>();
    assert_eq!(joy["total"], 1);
    assert_eq!(joy["items"][0]["rating"], 5);
    assert_eq!(joy["items"][0]["user"]["email"], "ada@example.com");

    let lenient = h
        .server
        .get("/api/admin/feedback")
        .add_header(AUTHORIZATION, bearer(&admin))
        .add_query_param("page", "")
        .add_query_param("minRating", "")
        .await;
    assert_eq!(lenient.status_code(), StatusCode::OK);
    assert_eq!(lenient.json::<Value>()["total"], 4);
}

#[tokio::test]
async fn test_admin_summary() {
    let h = harness();
    let ada = signup(&h.server, "Ada", "ada@example.com").await;
    submit(&h.server, &ada, json!(5), "i love this wonderful product").await;
    submit(&h.server, &ada, json!(3), "so happy with the great service").await;
    submit(&h.server, &ada, json!(1), "rude staff i am furious").await;

    let admin = admin_token(&h.server).await;
    let summary = h
        .server
        .get("/api/admin/summary")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .json::<Value>();

    assert_eq!(summary["totalFeedback"], 3);
    assert_eq!(summary["avgRating"], 3.0);
    assert_eq!(summary["byEmotion"][0], json!({ "emotion": "joy", "count": 2 }));
    assert_eq!(summary["byEmotion"][1], json!({ "emotion": "anger", "count": 1 }));
}

// =============================================================================
// AI TESTS
// =============================================================================

#[tokio::test]
async fn test_ai_warmup_status_and_predict() {
    let h = harness();

    let cold = h.server.get("/api/ai/status").await.json::<Value>();
    assert_eq!(cold["ready"], false);
    assert_eq!(cold["rows"], 0);

    let warm = h.server.get("/api/ai/warmup").await;
    assert_eq!(warm.status_code(), StatusCode::OK);
    assert_eq!(warm.json::<Value>()["ok"], true);

    let status = h.server.get("/api/ai/status").await.json::<Value>();
    assert_eq!(status["ready"], true);
    assert_eq!(status["rows"], 7);
    assert_eq!(status["labels"], json!(["anger", "fear", "joy"]));
    assert_eq!(status["source"], "corpus");

    let predicted = h
        .server
        .post("/api/ai/predict")
        .json(&json!({ "text": "I am so frightened and scared" }))
        .await;
    assert_eq!(predicted.status_code(), StatusCode::OK);
    assert_eq!(predicted.json::<Value>()["emotion"], "fear");

    let empty = h
        .server
        .post("/api/ai/predict")
        .json(&json!({ "text": "  " }))
        .await;
    assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(empty.json::<Value>()["message"], "text is required");
}

// =============================================================================
// CORS TESTS
// =============================================================================

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let origin = HeaderValue::from_static("http://localhost:5173");
    let http = HttpConfig {
        client_origin: Some(origin.clone()),
        ..HttpConfig::default()
    };
    let h = harness_with(true, http);

    let response = h
        .server
        .method(Method::OPTIONS, "/api/auth/login")
        .add_header(ORIGIN, origin.clone())
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"))
        .add_header(
            ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("content-type,authorization"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(ACCESS_CONTROL_ALLOW_ORIGIN), origin);
    assert_eq!(
        response.header(ACCESS_CONTROL_ALLOW_CREDENTIALS),
        HeaderValue::from_static("true")
    );
}

// =============================================================================
// RATE LIMIT TESTS
// =============================================================================

#[tokio::test]
async fn test_login_rate_limit() {
    let http = HttpConfig {
        client_origin: None,
        login_rate: RateLimitConfig {
            per_second: NonZeroU32::new(1).unwrap(),
            burst: NonZeroU32::new(2).unwrap(),
        },
    };
    let h = harness_with(true, http);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = h
            .server
            .post("/api/admin/login")
            .json(&json!({ "username": "admin", "password": "wrong" }))
            .await;
        statuses.push(response.status_code());
    }
    assert_eq!(statuses[..2], [StatusCode::UNAUTHORIZED, StatusCode::UNAUTHORIZED]);
    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);

    // Signup is not throttled.
    signup(&h.server, "Ada", "ada@example.com").await;
}

//! Shared harness: the full router over in-memory SQLite and an in-process
//! publisher standing in for the broker.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use camlink_core::config::TimeoutConfig;
use camlink_server::api::{AppState, build_router};
use camlink_server::auth::JwtManager;
use camlink_server::service::CamService;
use camlink_server::storage::CamDatabase;
use camlink_server::test_support::RecordingPublisher;

pub struct TestApp {
    pub router: axum::Router,
    pub service: Arc<CamService>,
    pub publisher: Arc<RecordingPublisher>,
    pub db: CamDatabase,
}

pub async fn app() -> TestApp {
    app_with(TimeoutConfig::default()).await
}

pub async fn app_with(timeouts: TimeoutConfig) -> TestApp {
    let db = CamDatabase::open_in_memory().await.unwrap();
    let publisher = Arc::new(RecordingPublisher::connected());
    let service = Arc::new(CamService::new(db.clone(), publisher.clone(), &timeouts));
    let jwt = Arc::new(JwtManager::new(b"integration-test-secret", 3600));
    let router = build_router(AppState::new(Arc::clone(&service), jwt), "*");
    TestApp {
        router,
        service,
        publisher,
        db,
    }
}

/// Send a request and return (status, JSON body).
pub async fn send(
    router: &axum::Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let resp = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Register `username` and return (user id, bearer token).
pub async fn signup(app: &TestApp, username: &str) -> (String, String) {
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/user/signin",
        None,
        Some(serde_json::json!({"username": username, "password": "secret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["data"]["userId"].as_str().unwrap().to_string(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

/// Attach a paired device with `token` to `user_id`; returns the device id.
pub async fn add_device(app: &TestApp, user_id: &str, token: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    app.db.insert_paired_device(&id, token, user_id).await.unwrap();
    id
}

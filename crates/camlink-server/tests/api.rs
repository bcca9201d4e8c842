//! HTTP API integration tests driven through `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use camlink_core::CommandKind;
use camlink_core::topic;
use common::{add_device, app, send, signup};

const UNKNOWN_ID: &str = "00000000-0000-4000-8000-000000000000";

#[tokio::test]
async fn health_reports_broker_and_waiters() {
    let app = app().await;
    let (status, body) = send(&app.router, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["mqttConnected"], true);
    assert_eq!(body["data"]["pendingCommands"], 0);
    assert_eq!(body["data"]["pendingPairings"], 0);
}

#[tokio::test]
async fn unknown_route_is_enveloped_404() {
    let app = app().await;
    let (status, body) = send(&app.router, Method::GET, "/api/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn register_then_login() {
    let app = app().await;
    let (user_id, token) = signup(&app, "alice").await;
    assert!(!token.is_empty());

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/user/login",
        None,
        Some(json!({"username": "alice", "password": "secret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], user_id.as_str());
    assert!(body["data"]["token"].is_string());

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/user/login",
        None,
        Some(json!({"username": "alice", "password": "wrong-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn registration_validation() {
    let app = app().await;
    signup(&app, "alice").await;

    let cases = [
        (json!({"username": "alice", "password": "secret-pass"}), StatusCode::CONFLICT),
        (json!({"username": "a!", "password": "secret-pass"}), StatusCode::BAD_REQUEST),
        (json!({"username": "bob"}), StatusCode::BAD_REQUEST),
        (json!({"username": "bob", "password": "x"}), StatusCode::BAD_REQUEST),
    ];
    for (payload, expected) in cases {
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/user/signin",
            None,
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, expected, "{payload} -> {body}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    let app = app().await;
    let resp = tower::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/user/signin")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app().await;
    let (user_id, _) = signup(&app, "alice").await;
    let uri = format!("/api/user/{user_id}/deviceList");

    let (status, _) = send(&app.router, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, Method::GET, &uri, Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn path_user_must_match_token() {
    let app = app().await;
    let (_, alice_token) = signup(&app, "alice").await;
    let (bob_id, _) = signup(&app, "bob").await;

    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/user/{bob_id}/deviceList"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");

    let (status, _) = send(
        &app.router,
        Method::GET,
        "/api/user/not-a-uuid/deviceList",
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_and_device_listing() {
    let app = app().await;
    let (user_id, token) = signup(&app, "alice").await;
    let device_id = add_device(&app, &user_id, "0123456789abcdef").await;

    let (status, body) = send(&app.router, Method::GET, "/api/user/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["deviceList"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/user/{user_id}/deviceList"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["deviceID"], device_id.as_str());
    assert_eq!(body["data"][0]["status"], "OFF");
    assert_eq!(body["data"][0]["isPaired"], true);

    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/device/{user_id}/status/{device_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recordCount"], 0);

    let (status, _) = send(
        &app.router,
        Method::GET,
        &format!("/api/device/{user_id}/status/{UNKNOWN_ID}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foreign_device_is_forbidden() {
    let app = app().await;
    let (alice_id, alice_token) = signup(&app, "alice").await;
    let (bob_id, _) = signup(&app, "bob").await;
    let bobs_device = add_device(&app, &bob_id, "0123456789abcdef").await;

    let (status, _) = send(
        &app.router,
        Method::GET,
        &format!("/api/user/{alice_id}/device/{bobs_device}/memoryList"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn streaming_rejects_unknown_action() {
    let app = app().await;
    let (user_id, token) = signup(&app, "alice").await;
    let device_id = add_device(&app, &user_id, "0123456789abcdef").await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/user/{user_id}/device/{device_id}/STM"),
        Some(&token),
        Some(json!({"action": "TOGGLE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], r#"Action must be "ON" or "OFF""#);
    assert!(app.publisher.published().is_empty());
}

#[tokio::test]
async fn command_without_broker_is_unavailable() {
    let app = app().await;
    app.publisher.set_connected(false);
    let (user_id, token) = signup(&app, "alice").await;
    let device_id = add_device(&app, &user_id, "0123456789abcdef").await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/user/{user_id}/device/{device_id}/STM"),
        Some(&token),
        Some(json!({"action": "on"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(!app.service.correlator().is_pending("0123456789abcdef", CommandKind::Streaming));
}

#[tokio::test]
async fn memory_command_round_trip() {
    let app = app().await;
    let (user_id, token) = signup(&app, "alice").await;
    let device_id = add_device(&app, &user_id, "0123456789abcdef").await;

    app.service
        .router()
        .route(
            &topic::record_topic("0123456789abcdef"),
            br#"{"folderName":"clip-1","fileCount":2,"size":1024}"#,
        )
        .expect("record arrival is persisted")
        .await
        .unwrap();

    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/user/{user_id}/device/{device_id}/memoryList"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let record_id = body["data"][0]["recordID"].as_str().unwrap().to_string();
    assert_eq!(body["data"][0]["folderName"], "clip-1");

    let router = app.router.clone();
    let uri = format!("/api/user/{user_id}/device/{device_id}/MEM");
    let request = tokio::spawn({
        let token = token.clone();
        let record_id = record_id.clone();
        async move {
            send(
                &router,
                Method::POST,
                &uri,
                Some(&token),
                Some(json!({"recordID": record_id})),
            )
            .await
        }
    });

    app.publisher.wait_for_publish(1).await;
    let (topic, payload) = app.publisher.published().remove(0);
    assert_eq!(topic, "api/0123456789abcdef/cam/memory");
    let command: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(command["command"], "GET_MEMORY");
    assert_eq!(command["recordID"], record_id.as_str());
    assert_eq!(command["folderName"], "clip-1");

    assert!(
        app.service
            .router()
            .route(&CommandKind::Memory.topic("0123456789abcdef"), br#"{"uploaded":true}"#)
            .is_none()
    );

    let (status, body) = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"uploaded": true}));
}

#[tokio::test]
async fn pairing_flow() {
    let app = app().await;
    let (user_id, token) = signup(&app, "alice").await;

    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/pair/{user_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let pair_token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(pair_token.len(), 16);
    assert_eq!(body["data"]["expiresIn"], 300);
    let status_uri = format!("/api/pair/{user_id}/status/{pair_token}");

    let (_, body) = send(&app.router, Method::GET, &status_uri, Some(&token), None).await;
    assert_eq!(body["paired"], false);
    assert!(app.service.negotiator().is_waiting(&pair_token));

    assert!(
        app.service
            .router()
            .route(&topic::pairing_topic(&pair_token), br#"{"deviceInfo":"x"}"#)
            .is_none()
    );

    let mut paired = Value::Null;
    for _ in 0..50 {
        let (status, body) = send(&app.router, Method::GET, &status_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        if body["paired"] == true {
            paired = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(paired["data"]["token"], pair_token.as_str());
    let device_id = paired["data"]["deviceID"].as_str().unwrap().to_string();

    let (_, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/pair/{user_id}/devices"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);

    let (status, _) = send(
        &app.router,
        Method::DELETE,
        &format!("/api/pair/{user_id}/device/{device_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/pair/{user_id}/devices"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn pairing_status_rejects_bad_tokens() {
    let app = app().await;
    let (user_id, token) = signup(&app, "alice").await;

    let (status, _) = send(
        &app.router,
        Method::GET,
        &format!("/api/pair/{user_id}/status/NOT-A-TOKEN"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/pair/{user_id}/status/0123456789abcdef"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paired"], false);
}

#[tokio::test]
async fn account_update_and_delete() {
    let app = app().await;
    let (_, token) = signup(&app, "alice").await;

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/api/user/account",
        Some(&token),
        Some(json!({"newPassword": "another-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/user/account",
        Some(&token),
        Some(json!({"username": "alice2", "password": "secret-pass", "newPassword": "another-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["username"], "alice2");

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/api/user/login",
        None,
        Some(json!({"username": "alice2", "password": "another-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, Method::DELETE, "/api/user/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // The token outlives the account but no longer authenticates.
    let (status, _) = send(&app.router, Method::GET, "/api/user/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

//! HTTP API for clients of the camera fleet.

mod devices;
mod error;
mod health;
mod pairing;
mod users;
mod views;

pub use error::{ApiError, ApiResult, Envelope};

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::JwtManager;
use crate::service::CamService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CamService>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub const fn new(service: Arc<CamService>, jwt: Arc<JwtManager>) -> Self {
        Self { service, jwt }
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!(origin = %origin, "Invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}

async fn not_found() -> (StatusCode, Envelope) {
    (
        StatusCode::NOT_FOUND,
        Envelope {
            success: false,
            message: Some("Route not found".to_string()),
            ..Envelope::ok()
        },
    )
}

/// Build the application router.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/user/signin", post(users::register))
        .route("/api/user/login", post(users::login))
        .route("/api/user/profile", get(users::profile))
        .route(
            "/api/user/account",
            post(users::update_account).delete(users::delete_account),
        )
        .route("/api/user/{user_id}/deviceList", get(devices::device_list))
        .route(
            "/api/user/{user_id}/device/{device_id}/memoryList",
            get(devices::memory_list),
        )
        .route(
            "/api/user/{user_id}/device/{device_id}/MEM",
            post(devices::send_memory),
        )
        .route(
            "/api/user/{user_id}/device/{device_id}/STM",
            post(devices::send_streaming),
        )
        .route("/api/device/{user_id}/status", get(devices::all_status))
        .route(
            "/api/device/{user_id}/status/{device_id}",
            get(devices::device_status),
        )
        .route("/api/pair/{user_id}", get(pairing::initiate))
        .route("/api/pair/{user_id}/status/{token}", get(pairing::status))
        .route("/api/pair/{user_id}/devices", get(pairing::paired_devices))
        .route(
            "/api/pair/{user_id}/device/{device_id}",
            delete(pairing::unpair),
        )
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

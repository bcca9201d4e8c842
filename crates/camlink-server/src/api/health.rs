//! Liveness endpoint.

use axum::extract::State;
use serde_json::json;

use super::AppState;
use super::error::Envelope;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Envelope {
    let service = &state.service;
    Envelope::ok().data(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "mqttConnected": service.is_connected(),
        "pendingCommands": service.correlator().in_flight(),
        "pendingPairings": service.negotiator().waiting(),
    }))
}

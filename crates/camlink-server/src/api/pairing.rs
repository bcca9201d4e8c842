//! Pairing routes.

use axum::extract::{Path, State};
use serde_json::json;
use tracing::{info, instrument};

use camlink_core::topic;
use camlink_core::validate;

use super::AppState;
use super::devices::{check_user, owned_device};
use super::error::{ApiError, ApiResult, Envelope};
use super::views::device_views;
use crate::auth::AuthUser;
use crate::service::PairingState;

/// `GET /api/pair/{userID}`
///
/// Returns the token straight away; pairing completes in the background
/// once the camera announces it.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn initiate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Envelope> {
    check_user(&auth, &user_id)?;
    let token = state.service.start_pairing(&user_id).await?;

    Ok(Envelope::ok()
        .message("Pairing initiated. Please configure your device with this token.")
        .data(json!({
            "token": token,
            "expiresIn": state.service.pairing_timeout().as_secs(),
            "instructions": format!(
                "Configure your device to publish to topic: {}",
                topic::pairing_topic(&token)
            ),
        })))
}

/// `GET /api/pair/{userID}/status/{token}`
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, token)): Path<(String, String)>,
) -> ApiResult<Envelope> {
    check_user(&auth, &user_id)?;
    if !validate::is_valid_device_token(&token) {
        return Err(ApiError::BadRequest("Invalid pairing token".to_string()));
    }

    match state.service.pairing_state(&user_id, &token).await? {
        PairingState::Paired => {
            let device = state
                .service
                .db()
                .get_device_by_token(&token)
                .await?
                .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;
            Ok(Envelope::ok()
                .paired(true)
                .message("Device paired successfully")
                .data(json!({
                    "deviceID": device.id,
                    "token": device.token,
                    "status": device.status(),
                    "pairedAt": device.created_at,
                })))
        }
        PairingState::PairedElsewhere => Err(ApiError::Forbidden(
            "This device is paired to another user".to_string(),
        )),
        PairingState::Waiting => Ok(Envelope::ok()
            .paired(false)
            .message("Device not yet paired. Waiting for device connection...")),
        PairingState::Unknown => Ok(Envelope::ok()
            .paired(false)
            .message("No pairing in progress for this token")),
    }
}

/// `GET /api/pair/{userID}/devices`
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn paired_devices(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Envelope> {
    check_user(&auth, &user_id)?;
    let devices = state.service.db().list_devices(&user_id, true).await?;
    Ok(Envelope::ok().list(&device_views(&devices)))
}

/// `DELETE /api/pair/{userID}/device/{deviceID}`
#[instrument(skip_all, fields(user_id = %user_id, device_id = %device_id))]
pub async fn unpair(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, device_id)): Path<(String, String)>,
) -> ApiResult<Envelope> {
    let device = owned_device(&state, &auth, &user_id, &device_id).await?;
    state.service.db().delete_device(&device.id).await?;
    info!(token = %device.token, "Device unpaired");
    Ok(Envelope::ok().message("Device unpaired successfully"))
}

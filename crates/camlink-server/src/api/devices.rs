//! Device routes: listings, status, and the commands that wait on a camera.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::{info, instrument};

use camlink_core::validate;
use camlink_core::{DeviceCommand, StreamAction};

use super::AppState;
use super::error::{ApiError, ApiResult, Envelope};
use super::users::body;
use super::views::{DeviceView, RecordView, device_views};
use crate::auth::AuthUser;
use crate::storage::Device;

#[derive(Debug, Deserialize)]
pub struct MemoryRequest {
    #[serde(rename = "recordID", default)]
    record_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamingRequest {
    #[serde(default)]
    action: String,
}

pub(super) fn check_user(auth: &AuthUser, user_id: &str) -> ApiResult<()> {
    if !validate::is_valid_id(user_id) {
        return Err(ApiError::BadRequest("Invalid user ID".to_string()));
    }
    auth.ensure_is(user_id)
}

/// Resolve `device_id` for `user_id`, checking the caller may act on it.
pub(super) async fn owned_device(
    state: &AppState,
    auth: &AuthUser,
    user_id: &str,
    device_id: &str,
) -> ApiResult<Device> {
    if !validate::is_valid_id(user_id) || !validate::is_valid_id(device_id) {
        return Err(ApiError::BadRequest(
            "Invalid user ID or device ID".to_string(),
        ));
    }
    auth.ensure_is(user_id)?;

    let device = state.service.db().get_device(device_id).await?;
    if device.owner_id.as_deref() != Some(user_id) {
        return Err(ApiError::Forbidden(
            "You do not have access to this device".to_string(),
        ));
    }
    Ok(device)
}

/// `GET /api/user/{userID}/deviceList`
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn device_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Envelope> {
    check_user(&auth, &user_id)?;
    let devices = state.service.db().list_devices(&user_id, false).await?;
    Ok(Envelope::ok().list(&device_views(&devices)))
}

/// `GET /api/user/{userID}/device/{deviceID}/memoryList`
#[instrument(skip_all, fields(user_id = %user_id, device_id = %device_id))]
pub async fn memory_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, device_id)): Path<(String, String)>,
) -> ApiResult<Envelope> {
    let device = owned_device(&state, &auth, &user_id, &device_id).await?;
    let records = state.service.db().list_records(&device.id).await?;
    let views: Vec<RecordView> = records.iter().map(RecordView::from).collect();
    Ok(Envelope::ok().list(&views))
}

/// `POST /api/user/{userID}/device/{deviceID}/MEM`
///
/// Asks the camera to upload a stored recording and waits for its reply.
#[instrument(skip_all, fields(user_id = %user_id, device_id = %device_id))]
pub async fn send_memory(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, device_id)): Path<(String, String)>,
    payload: Result<Json<MemoryRequest>, JsonRejection>,
) -> ApiResult<Envelope> {
    let req = body(payload)?;
    if !validate::is_valid_id(&req.record_id) {
        return Err(ApiError::BadRequest("Valid record ID is required".to_string()));
    }
    let device = owned_device(&state, &auth, &user_id, &device_id).await?;

    let record = state.service.db().get_record(&req.record_id).await?;
    if record.device_id != device.id {
        return Err(ApiError::NotFound("Record not found".to_string()));
    }

    info!(token = %device.token, record_id = %record.id, "Sending memory command");
    let command = DeviceCommand::get_memory(&record.id, &record.folder_name);
    let reply = state.service.send_command(&device.token, &command).await?;
    info!(token = %device.token, "Memory command answered");

    Ok(Envelope::ok()
        .message("Memory data request sent successfully")
        .data(reply))
}

/// `POST /api/user/{userID}/device/{deviceID}/STM`
///
/// Switches the camera's live stream and waits for its reply.
#[instrument(skip_all, fields(user_id = %user_id, device_id = %device_id))]
pub async fn send_streaming(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, device_id)): Path<(String, String)>,
    payload: Result<Json<StreamingRequest>, JsonRejection>,
) -> ApiResult<Envelope> {
    let req = body(payload)?;
    let action = StreamAction::parse(&req.action)
        .ok_or_else(|| ApiError::BadRequest(r#"Action must be "ON" or "OFF""#.to_string()))?;
    let device = owned_device(&state, &auth, &user_id, &device_id).await?;

    info!(token = %device.token, action = action.as_str(), "Sending streaming command");
    let reply = state
        .service
        .send_command(&device.token, &DeviceCommand::streaming(action))
        .await?;
    info!(token = %device.token, "Streaming command answered");

    Ok(Envelope::ok()
        .message(format!(
            "Streaming {} command sent successfully",
            action.as_str().to_lowercase()
        ))
        .data(reply))
}

/// `GET /api/device/{userID}/status`
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn all_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Envelope> {
    check_user(&auth, &user_id)?;
    let devices = state.service.db().list_devices(&user_id, false).await?;
    Ok(Envelope::ok().list(&device_views(&devices)))
}

/// `GET /api/device/{userID}/status/{deviceID}`
#[instrument(skip_all, fields(user_id = %user_id, device_id = %device_id))]
pub async fn device_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, device_id)): Path<(String, String)>,
) -> ApiResult<Envelope> {
    let device = owned_device(&state, &auth, &user_id, &device_id).await?;
    let mut view = DeviceView::from(&device);
    view.record_count = Some(state.service.db().count_records(&device.id).await?);
    Ok(Envelope::ok().data(view))
}

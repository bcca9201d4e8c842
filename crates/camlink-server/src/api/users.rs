//! Account routes: registration, login, profile, account changes.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use camlink_core::db::DatabaseError;
use camlink_core::validate;

use super::error::{ApiError, ApiResult, Envelope};
use super::views::{UserView, device_views};
use super::AppState;
use crate::auth::AuthUser;
use crate::auth::password;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    username: Option<String>,
    /// Current password; required to set `new_password`.
    password: Option<String>,
    new_password: Option<String>,
}

pub(super) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn issue_token(state: &AppState, user_id: &str, username: &str) -> ApiResult<UserView> {
    let (token, expires_in) = state
        .jwt
        .issue(user_id, username)
        .map_err(|e| ApiError::Internal(format!("Token creation failed: {e}")))?;
    Ok(UserView {
        user_id: user_id.to_string(),
        username: username.to_string(),
        token: Some(token),
        expires_in: Some(expires_in),
    })
}

/// `POST /api/user/signin`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<(StatusCode, Envelope)> {
    let req = body(payload)?;
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide username and password".to_string(),
        ));
    }
    if !validate::is_valid_username(&req.username) {
        return Err(ApiError::BadRequest(
            "Username must be 3-20 characters and contain only letters, numbers, and underscores"
                .to_string(),
        ));
    }
    if !validate::is_valid_password(&req.password) {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            validate::MIN_PASSWORD_LEN
        )));
    }

    let db = state.service.db();
    if db.username_taken(&req.username).await? {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let hash = password::hash_password(&req.password)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;
    let user_id = uuid::Uuid::new_v4().to_string();
    db.create_user(&user_id, &req.username, &hash).await?;

    let view = issue_token(&state, &user_id, &req.username)?;
    info!(user_id = %user_id, username = %req.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Envelope::ok()
            .message("User registered successfully")
            .data(view),
    ))
}

/// `POST /api/user/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Envelope> {
    let req = body(payload)?;
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide username and password".to_string(),
        ));
    }

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let user = match state.service.db().get_user_by_username(&req.username).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };
    if !password::verify_password(&req.password, &user.password_hash) {
        warn!(username = %req.username, "Failed login attempt");
        return Err(invalid());
    }

    let view = issue_token(&state, &user.id, &user.username)?;
    info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok(Envelope::ok().message("Login successful").data(view))
}

/// `GET /api/user/profile`
#[instrument(skip_all, fields(user_id = %auth.id))]
pub async fn profile(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Envelope> {
    let db = state.service.db();
    let user = db.get_user(&auth.id).await?;
    let devices = db.list_devices(&auth.id, false).await?;

    Ok(Envelope::ok().data(json!({
        "userId": user.id,
        "username": user.username,
        "createdAt": user.created_at,
        "deviceList": device_views(&devices),
    })))
}

/// `POST /api/user/account`
#[instrument(skip_all, fields(user_id = %auth.id))]
pub async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<AccountUpdate>, JsonRejection>,
) -> ApiResult<Envelope> {
    let req = body(payload)?;
    let db = state.service.db();
    let user = db.get_user(&auth.id).await?;

    let new_username = match req.username.as_deref() {
        Some(name) if !name.is_empty() && name != user.username => {
            if !validate::is_valid_username(name) {
                return Err(ApiError::BadRequest("Invalid username format".to_string()));
            }
            if db.username_taken(name).await? {
                return Err(ApiError::Conflict("Username already exists".to_string()));
            }
            Some(name)
        }
        _ => None,
    };

    let new_hash = match req.new_password.as_deref() {
        Some(new_password) if !new_password.is_empty() => {
            let Some(current) = req.password.as_deref().filter(|p| !p.is_empty()) else {
                return Err(ApiError::BadRequest(
                    "Current password is required to change password".to_string(),
                ));
            };
            if !password::verify_password(current, &user.password_hash) {
                return Err(ApiError::Unauthorized(
                    "Current password is incorrect".to_string(),
                ));
            }
            if !validate::is_valid_password(new_password) {
                return Err(ApiError::BadRequest(format!(
                    "New password must be at least {} characters",
                    validate::MIN_PASSWORD_LEN
                )));
            }
            let hash = password::hash_password(new_password)
                .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;
            Some(hash)
        }
        _ => None,
    };

    let user = db
        .update_user(&auth.id, new_username, new_hash.as_deref())
        .await?;
    info!(username = %user.username, "User account updated");

    Ok(Envelope::ok()
        .message("Account updated successfully")
        .data(UserView::from(&user)))
}

/// `DELETE /api/user/account`
#[instrument(skip_all, fields(user_id = %auth.id))]
pub async fn delete_account(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Envelope> {
    if !state.service.db().delete_user(&auth.id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    info!(username = %auth.username, "User account deleted");
    Ok(Envelope::ok().message("Account deleted successfully"))
}

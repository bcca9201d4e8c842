//! Bearer-token extractor for protected routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use camlink_core::db::DatabaseError;

use crate::api::{ApiError, AppState};

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// The user a request is authenticated as.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

impl AuthUser {
    /// Reject requests whose path `userID` is someone else.
    pub fn ensure_is(&self, user_id: &str) -> Result<(), ApiError> {
        if self.id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Access denied".to_string()))
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| ApiError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        let claims = state.jwt.validate(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::Unauthorized(NOT_AUTHORIZED.to_string())
        })?;

        // The token may outlive the account.
        let user = match state.service.db().get_user(claims.user_id()).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => {
                return Err(ApiError::Unauthorized("User not found".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            id: user.id,
            username: user.username,
        })
    }
}

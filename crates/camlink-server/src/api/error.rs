//! HTTP error mapping and the JSON response envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use camlink_core::db::DatabaseError;

use crate::correlator::CommandError;
use crate::pairing::PairingError;
use crate::service::PairingStartError;

/// Body of every API response.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            paired: None,
            data: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// Attach a list and its length.
    pub fn list<T: Serialize>(mut self, items: &[T]) -> Self {
        self.count = Some(items.len());
        self.data = serde_json::to_value(items).ok();
        self
    }

    pub const fn paired(mut self, paired: bool) -> Self {
        self.paired = Some(paired);
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::Database(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::Command(CommandError::RequestInFlight(_)) => {
                StatusCode::CONFLICT
            }
            Self::Command(CommandError::DeviceTimeout(_)) => StatusCode::REQUEST_TIMEOUT,
            Self::Command(CommandError::TransportUnavailable(_) | CommandError::Cancelled) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Command(CommandError::Encode(_)) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Command(CommandError::DeviceTimeout(_)) => {
                "Device did not respond in time".to_string()
            }
            Self::Command(CommandError::TransportUnavailable(_)) => {
                "Device messaging is currently unavailable".to_string()
            }
            Self::Command(CommandError::RequestInFlight(kind)) => {
                format!("A {kind} command is already waiting for this device")
            }
            Self::Command(CommandError::Cancelled) => "Server is shutting down".to_string(),
            Self::Database(DatabaseError::NotFound(what)) => format!("{what} not found"),
            Self::Command(CommandError::Encode(_)) | Self::Database(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<PairingStartError> for ApiError {
    fn from(e: PairingStartError) -> Self {
        match e {
            PairingStartError::Database(e) => Self::Database(e),
            PairingStartError::Pairing(PairingError::AlreadyWaiting) => {
                Self::Conflict("Pairing already in progress for this token".to_string())
            }
            PairingStartError::Pairing(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Envelope {
            success: false,
            message: Some(self.client_message()),
            count: None,
            paired: None,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

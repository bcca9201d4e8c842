//! Data models for camlink storage.

use serde::{Deserialize, Serialize};

use camlink_core::DeviceStatus;
use camlink_core::status;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: String,
    pub token: String,
    pub owner_id: Option<String>,
    pub status: String,
    pub streaming_url: Option<String>,
    pub is_paired: bool,
    pub last_seen: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Device {
    /// Parsed status; the column is constrained, so a bad value reads as off.
    pub fn status(&self) -> DeviceStatus {
        self.status.parse().unwrap_or_default()
    }

    /// Whether the device counts as online at `now` (unix seconds).
    pub fn is_online(&self, now: i64) -> bool {
        status::is_online(self.status(), self.last_seen, now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: String,
    pub device_id: String,
    pub folder_name: String,
    pub file_count: i64,
    pub size: i64,
    pub upload_status: String,
    pub duration: Option<f64>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields of a new record row.
#[derive(Debug, Clone, Default)]
pub struct NewRecord<'a> {
    pub id: &'a str,
    pub device_id: &'a str,
    pub folder_name: &'a str,
    pub file_count: i64,
    pub size: i64,
    pub duration: Option<f64>,
    pub resolution: Option<&'a str>,
    pub fps: Option<f64>,
}

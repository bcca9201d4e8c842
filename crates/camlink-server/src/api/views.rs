//! JSON shapes returned to clients.

use serde::Serialize;

use camlink_core::db::unix_timestamp;

use crate::storage::{Device, Record, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub token: String,
    pub status: String,
    pub last_seen: i64,
    pub is_online: bool,
    pub is_paired: bool,
    pub streaming_url: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<i64>,
}

impl From<&Device> for DeviceView {
    fn from(device: &Device) -> Self {
        Self {
            device_id: device.id.clone(),
            token: device.token.clone(),
            status: device.status().to_string(),
            last_seen: device.last_seen,
            is_online: device.is_online(unix_timestamp()),
            is_paired: device.is_paired,
            streaming_url: device.streaming_url.clone(),
            created_at: device.created_at,
            record_count: None,
        }
    }
}

pub fn device_views(devices: &[Device]) -> Vec<DeviceView> {
    devices.iter().map(DeviceView::from).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadataView {
    pub duration: Option<f64>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(rename = "recordID")]
    pub record_id: String,
    pub folder_name: String,
    pub file_count: i64,
    pub size: i64,
    pub upload_status: String,
    pub metadata: RecordMetadataView,
    pub created_at: i64,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            record_id: record.id.clone(),
            folder_name: record.folder_name.clone(),
            file_count: record.file_count,
            size: record.size,
            upload_status: record.upload_status.clone(),
            metadata: RecordMetadataView {
                duration: record.duration,
                resolution: record.resolution.clone(),
                fps: record.fps,
            },
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            token: None,
            expires_in: None,
        }
    }
}

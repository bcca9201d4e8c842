//! Persistence seams used by the message router and the pairing session.
//!
//! The router only needs a handful of device/record operations, so it talks
//! to these traits rather than to [`CamDatabase`] directly.

use async_trait::async_trait;

use camlink_core::DeviceStatus;
use camlink_core::command::RecordAnnouncement;
use camlink_core::db::DatabaseError;

use super::db::CamDatabase;
use super::models::{Device, NewRecord, Record};

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<Device>, DatabaseError>;

    /// Returns `false` when no device has `token`.
    async fn update_status(&self, token: &str, status: DeviceStatus)
    -> Result<bool, DatabaseError>;

    /// Returns `false` when no device has `token`.
    async fn set_streaming_url(&self, token: &str, url: &str) -> Result<bool, DatabaseError>;

    async fn create_paired_device(
        &self,
        token: &str,
        owner_id: &str,
    ) -> Result<Device, DatabaseError>;

    async fn token_exists(&self, token: &str) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn create_record(
        &self,
        device_id: &str,
        announcement: &RecordAnnouncement,
    ) -> Result<Record, DatabaseError>;
}

#[async_trait]
impl DeviceRepository for CamDatabase {
    async fn find_by_token(&self, token: &str) -> Result<Option<Device>, DatabaseError> {
        self.get_device_by_token(token).await
    }

    async fn update_status(
        &self,
        token: &str,
        status: DeviceStatus,
    ) -> Result<bool, DatabaseError> {
        self.update_device_status(token, status).await
    }

    async fn set_streaming_url(&self, token: &str, url: &str) -> Result<bool, DatabaseError> {
        self.set_device_streaming_url(token, url).await
    }

    async fn create_paired_device(
        &self,
        token: &str,
        owner_id: &str,
    ) -> Result<Device, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.insert_paired_device(&id, token, owner_id).await
    }

    async fn token_exists(&self, token: &str) -> Result<bool, DatabaseError> {
        self.device_token_exists(token).await
    }
}

#[async_trait]
impl RecordRepository for CamDatabase {
    async fn create_record(
        &self,
        device_id: &str,
        announcement: &RecordAnnouncement,
    ) -> Result<Record, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        let metadata = announcement.metadata.clone().unwrap_or_default();
        let record = NewRecord {
            id: &id,
            device_id,
            folder_name: &announcement.folder_name,
            file_count: announcement.file_count.unwrap_or(0),
            size: announcement.size.unwrap_or(0),
            duration: metadata.duration,
            resolution: metadata.resolution.as_deref(),
            fps: metadata.fps,
        };
        self.insert_record(&record).await
    }
}

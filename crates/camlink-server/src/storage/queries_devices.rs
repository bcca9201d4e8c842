//! Device queries for the camlink server.

use camlink_core::DeviceStatus;
use camlink_core::db::{DatabaseError, unix_timestamp};

use super::db::CamDatabase;
use super::models::Device;

impl CamDatabase {
    /// Insert a freshly paired device owned by `owner_id`.
    pub async fn insert_paired_device(
        &self,
        id: &str,
        token: &str,
        owner_id: &str,
    ) -> Result<Device, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO devices (id, token, owner_id, status, is_paired, last_seen, created_at, updated_at) VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(id)
        .bind(token)
        .bind(owner_id)
        .bind(DeviceStatus::Off.as_str())
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_device(id).await
    }

    /// Get a device by ID.
    pub async fn get_device(&self, id: &str) -> Result<Device, DatabaseError> {
        sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {id}")))
    }

    /// Get a device by its bus token.
    pub async fn get_device_by_token(&self, token: &str) -> Result<Option<Device>, DatabaseError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE token = ?")
            .bind(token)
            .fetch_optional(self.pool())
            .await?;
        Ok(device)
    }

    /// Get a device only if `owner_id` owns it.
    pub async fn get_owned_device(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Device>, DatabaseError> {
        let device =
            sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ? AND owner_id = ?")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(device)
    }

    /// List devices for an owner, optionally only paired ones.
    pub async fn list_devices(
        &self,
        owner_id: &str,
        paired_only: bool,
    ) -> Result<Vec<Device>, DatabaseError> {
        let devices = if paired_only {
            sqlx::query_as::<_, Device>(
                "SELECT * FROM devices WHERE owner_id = ? AND is_paired = 1 ORDER BY created_at ASC",
            )
            .bind(owner_id)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, Device>(
                "SELECT * FROM devices WHERE owner_id = ? ORDER BY created_at ASC",
            )
            .bind(owner_id)
            .fetch_all(self.pool())
            .await?
        };

        Ok(devices)
    }

    /// Store a new status for the device with `token`.
    ///
    /// `last_seen` moves only when the status actually changes. Returns
    /// `false` when no device has that token.
    pub async fn update_device_status(
        &self,
        token: &str,
        status: DeviceStatus,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE devices SET last_seen = CASE WHEN status <> ? THEN ? ELSE last_seen END, status = ?, updated_at = ? WHERE token = ?",
        )
        .bind(status.as_str())
        .bind(now)
        .bind(status.as_str())
        .bind(now)
        .bind(token)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record the stream URL a device replied with; the device is streaming.
    pub async fn set_device_streaming_url(
        &self,
        token: &str,
        url: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();
        let streaming = DeviceStatus::Streaming.as_str();

        let result = sqlx::query(
            "UPDATE devices SET streaming_url = ?, last_seen = CASE WHEN status <> ? THEN ? ELSE last_seen END, status = ?, updated_at = ? WHERE token = ?",
        )
        .bind(url)
        .bind(streaming)
        .bind(now)
        .bind(streaming)
        .bind(now)
        .bind(token)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether any device already uses `token`.
    pub async fn device_token_exists(&self, token: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM devices WHERE token = ?")
            .bind(token)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0 > 0)
    }

    /// Remove a device (and its records).
    pub async fn delete_device(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

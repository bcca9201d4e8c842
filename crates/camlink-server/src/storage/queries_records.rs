//! Record (stored recording) queries for the camlink server.

use camlink_core::db::{DatabaseError, unix_timestamp};

use super::db::CamDatabase;
use super::models::{NewRecord, Record};

impl CamDatabase {
    /// Insert a record announced by a device.
    pub async fn insert_record(&self, record: &NewRecord<'_>) -> Result<Record, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO records (id, device_id, folder_name, file_count, size, duration, resolution, fps, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(record.device_id)
        .bind(record.folder_name)
        .bind(record.file_count)
        .bind(record.size)
        .bind(record.duration)
        .bind(record.resolution)
        .bind(record.fps)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_record(record.id).await
    }

    /// Get a record by ID.
    pub async fn get_record(&self, id: &str) -> Result<Record, DatabaseError> {
        sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Record {id}")))
    }

    /// Records of a device, newest first.
    pub async fn list_records(&self, device_id: &str) -> Result<Vec<Record>, DatabaseError> {
        let records = sqlx::query_as::<_, Record>(
            "SELECT * FROM records WHERE device_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(device_id)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }

    /// Count records of a device.
    pub async fn count_records(&self, device_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records WHERE device_id = ?")
            .bind(device_id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}

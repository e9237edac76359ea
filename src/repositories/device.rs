use std::sync::Arc;

use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::errors::DeviceError;
use crate::models::Device;

/// Durable registry of known devices. Sole owner of threshold/mode state;
/// the ingestion pipeline and command dispatcher mutate devices only through
/// these methods.
pub struct DeviceRepository {
    storage: Arc<Storage>,
}

impl DeviceRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn all(&self) -> Result<Vec<Device>, Error> {
        let devices: Vec<Device> = sqlx::query_as("SELECT * FROM devices ORDER BY name")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(devices)
    }

    pub async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as("SELECT * FROM devices WHERE device_id = $1")
            .bind(device_id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(device)
    }

    /// Administrative create. Thresholds and flags start at their column
    /// defaults; the device is offline until its first sighting.
    pub async fn create(
        &self,
        device_id: &str,
        name: &str,
        location: Option<&str>,
    ) -> Result<Device, Error> {
        let device: Device = sqlx::query_as(
            r#"
            INSERT INTO devices (device_id, name, location, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(device_id)
        .bind(name)
        .bind(location)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.storage.get_pool())
        .await?;

        Ok(device)
    }

    pub async fn update_profile(
        &self,
        device_id: &str,
        name: &str,
        location: Option<&str>,
    ) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as(
            r#"
            UPDATE devices
            SET name = $1, location = COALESCE($2, location)
            WHERE device_id = $3
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(location)
        .bind(device_id)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(device)
    }

    /// Called for every inbound message that proves the device is alive.
    /// Unknown devices are auto-provisioned with a generated name and
    /// default thresholds; known devices get `last_seen`/`is_online`
    /// refreshed (last writer wins).
    pub async fn upsert_on_sighting(&self, device_id: &str) -> Result<Device, Error> {
        let now = OffsetDateTime::now_utc();

        let device: Device = sqlx::query_as(
            r#"
            INSERT INTO devices (device_id, name, is_online, last_seen, created_at)
            VALUES ($1, $2, TRUE, $3, $3)
            ON CONFLICT (device_id)
            DO UPDATE SET last_seen = excluded.last_seen, is_online = TRUE
            RETURNING *
            "#,
        )
        .bind(device_id)
        .bind(Device::default_name(device_id))
        .bind(now)
        .fetch_one(self.storage.get_pool())
        .await?;

        Ok(device)
    }

    pub async fn mark_seen(&self, device_id: &str) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as(
            r#"
            UPDATE devices
            SET last_seen = $1, is_online = TRUE
            WHERE device_id = $2
            RETURNING *
            "#,
        )
        .bind(OffsetDateTime::now_utc())
        .bind(device_id)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(device)
    }

    pub async fn set_mode(&self, device_id: &str, auto_mode: bool) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as(
            r#"
            UPDATE devices
            SET auto_mode = $1
            WHERE device_id = $2
            RETURNING *
            "#,
        )
        .bind(auto_mode)
        .bind(device_id)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(device)
    }

    /// Threshold/notification edit. The threshold pair is validated against
    /// the values that would result from the edit, and applied
    /// both-or-neither: a rejected edit leaves the stored settings untouched.
    pub async fn update_settings(
        &self,
        device_id: &str,
        moisture_low: Option<f64>,
        moisture_high: Option<f64>,
        notifications_enabled: Option<bool>,
    ) -> Result<Device, DeviceError> {
        let current = self
            .find_by_device_id(device_id)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        let low = moisture_low.unwrap_or(current.moisture_low);
        let high = moisture_high.unwrap_or(current.moisture_high);

        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low >= high {
            return Err(DeviceError::InvalidThresholds { low, high });
        }

        let device: Device = sqlx::query_as(
            r#"
            UPDATE devices
            SET moisture_low = $1, moisture_high = $2, notifications_enabled = $3
            WHERE device_id = $4
            RETURNING *
            "#,
        )
        .bind(low)
        .bind(high)
        .bind(notifications_enabled.unwrap_or(current.notifications_enabled))
        .bind(device_id)
        .fetch_one(self.storage.get_pool())
        .await?;

        Ok(device)
    }

    pub async fn mark_offline(&self, device_id: &str) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET is_online = FALSE WHERE device_id = $1")
            .bind(device_id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    /// Devices still flagged online whose last sighting predates the cutoff.
    pub async fn find_stale(&self, cutoff: OffsetDateTime) -> Result<Vec<Device>, Error> {
        let devices: Vec<Device> = sqlx::query_as(
            r#"
            SELECT * FROM devices
            WHERE is_online = TRUE AND (last_seen IS NULL OR last_seen < $1)
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(devices)
    }

    pub async fn delete(&self, device_id: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM devices WHERE device_id = $1")
            .bind(device_id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

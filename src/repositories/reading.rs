use std::sync::Arc;

use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::errors::MessageError;
use crate::models::Reading;

/// Append-only store of sensor observations.
pub struct ReadingRepository {
    storage: Arc<Storage>,
}

impl ReadingRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Persist a normalized reading. Percentage fields are range-checked
    /// here, at the store boundary: out-of-range values are rejected, not
    /// coerced (the normalizer's floor-at-zero rule for moisture is the one
    /// documented exception).
    pub async fn create(&self, item: &Reading) -> Result<Reading, MessageError> {
        if !(0.0..=100.0).contains(&item.soil_moisture) {
            return Err(MessageError::OutOfRange {
                field: "soil_moisture",
                value: item.soil_moisture,
            });
        }
        if !(0.0..=100.0).contains(&item.humidity) {
            return Err(MessageError::OutOfRange {
                field: "humidity",
                value: item.humidity,
            });
        }

        let reading: Reading = sqlx::query_as(
            r#"
            INSERT INTO readings (device_id, soil_moisture, temperature, humidity, pump_status, dht_error, time)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&item.device_id)
        .bind(item.soil_moisture)
        .bind(item.temperature)
        .bind(item.humidity)
        .bind(item.pump_status)
        .bind(item.dht_error)
        .bind(item.time)
        .fetch_one(self.storage.get_pool())
        .await?;

        Ok(reading)
    }

    pub async fn find_latest_by_device_id(
        &self,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<Reading>, Error> {
        let readings: Vec<Reading> = sqlx::query_as(
            r#"
            SELECT * FROM readings
            WHERE device_id = $1
            ORDER BY time DESC
            LIMIT $2
            "#,
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(readings)
    }

    pub async fn find_by_device_id_and_time_range(
        &self,
        device_id: &str,
        start_time: OffsetDateTime,
        end_time: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Reading>, Error> {
        let readings: Vec<Reading> = sqlx::query_as(
            r#"
            SELECT * FROM readings
            WHERE device_id = $1 AND time >= $2 AND time <= $3
            ORDER BY time ASC
            LIMIT $4
            "#,
        )
        .bind(device_id)
        .bind(start_time)
        .bind(end_time)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(readings)
    }
}

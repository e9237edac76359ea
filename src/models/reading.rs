use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::Table;

/// One accepted sensor observation. Append-only: rows are never mutated
/// after insert. `device_id` is the external identifier, deliberately not a
/// foreign key, so readings can be stored before their device is registered.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: i32,
    pub device_id: String,
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub pump_status: bool,
    /// Set when the temperature/humidity sensor malfunctioned on this sample.
    pub dht_error: bool,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

#[derive(Clone)]
pub struct ReadingTable;

impl Table for ReadingTable {
    fn name(&self) -> &'static str {
        "readings"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                soil_moisture REAL NOT NULL,
                temperature REAL NOT NULL,
                humidity REAL NOT NULL,
                pump_status BOOLEAN NOT NULL DEFAULT FALSE,
                dht_error BOOLEAN NOT NULL DEFAULT FALSE,
                time DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_readings_device_time ON readings (device_id, time);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS readings;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

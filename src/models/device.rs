use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::Table;

/// Factory defaults for the per-device irrigation thresholds. These drive
/// pump automation on the device and are distinct from the fixed safety
/// ranges checked by the alert evaluator.
pub const DEFAULT_MOISTURE_LOW: f64 = 30.0;
pub const DEFAULT_MOISTURE_HIGH: f64 = 55.0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i32,
    pub device_id: String,
    pub name: String,
    pub location: Option<String>,
    pub auto_mode: bool,
    pub is_online: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_seen: Option<OffsetDateTime>,
    #[serde(rename = "moistureThresholdLow")]
    pub moisture_low: f64,
    #[serde(rename = "moistureThresholdHigh")]
    pub moisture_high: f64,
    pub notifications_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Device {
    /// Display name derived from the trailing characters of the external id,
    /// used when a device is auto-provisioned on first sighting.
    pub fn default_name(device_id: &str) -> String {
        let tail_start = device_id.len().saturating_sub(6);
        format!("Device {}", &device_id[tail_start..])
    }
}

#[derive(Clone)]
pub struct DeviceTable;

impl Table for DeviceTable {
    fn name(&self) -> &'static str {
        "devices"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                location TEXT,
                auto_mode BOOLEAN NOT NULL DEFAULT TRUE,
                is_online BOOLEAN NOT NULL DEFAULT FALSE,
                last_seen DATETIME,
                moisture_low REAL NOT NULL DEFAULT 30,
                moisture_high REAL NOT NULL DEFAULT 55,
                notifications_enabled BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS devices;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

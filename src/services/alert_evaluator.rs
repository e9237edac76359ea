use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::{Device, Reading};

// Fixed safety ranges. Deliberately independent of the per-device
// moisture_low/moisture_high pair, which drives pump automation, not
// alerting.
const MOISTURE_CRITICAL: f64 = 20.0;
const TEMPERATURE_MIN: f64 = 10.0;
const TEMPERATURE_MAX: f64 = 40.0;
const HUMIDITY_MIN: f64 = 20.0;
const HUMIDITY_MAX: f64 = 90.0;

/// Alert raised for a reading outside the safety ranges, or relayed from a
/// device-originated alert message. Ephemeral: delivered to the
/// notification gateway and dropped, never persisted as an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAlert {
    pub device_id: String,
    pub device_name: String,
    pub alert_type: String,
    pub message: String,
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Check a reading against the fixed safety ranges. A malfunctioning DHT
/// sample (temperature/humidity zeroed by the normalizer) is judged on soil
/// moisture alone. At most one alert per reading, listing every violated
/// bound.
pub fn evaluate(reading: &Reading, device: &Device) -> Option<DeviceAlert> {
    let mut abnormal = Vec::new();

    if reading.soil_moisture < MOISTURE_CRITICAL {
        abnormal.push(format!(
            "Soil moisture critically low: {}%",
            reading.soil_moisture
        ));
    }

    if !reading.dht_error {
        if reading.temperature < TEMPERATURE_MIN || reading.temperature > TEMPERATURE_MAX {
            abnormal.push(format!(
                "Temperature outside normal range: {}°C",
                reading.temperature
            ));
        }

        if reading.humidity < HUMIDITY_MIN || reading.humidity > HUMIDITY_MAX {
            abnormal.push(format!(
                "Humidity outside normal range: {}%",
                reading.humidity
            ));
        }
    }

    if abnormal.is_empty() {
        return None;
    }

    Some(DeviceAlert {
        device_id: device.device_id.clone(),
        device_name: device.name.clone(),
        alert_type: "abnormal_readings".to_string(),
        message: abnormal.join("; "),
        soil_moisture: reading.soil_moisture,
        temperature: reading.temperature,
        humidity: reading.humidity,
        timestamp: reading.time,
    })
}

#[cfg(test)]
mod tests {
    use crate::models::device::{DEFAULT_MOISTURE_HIGH, DEFAULT_MOISTURE_LOW};

    use super::*;

    fn test_device() -> Device {
        Device {
            id: 1,
            device_id: "dev1".to_string(),
            name: "Device dev1".to_string(),
            location: None,
            auto_mode: true,
            is_online: true,
            last_seen: Some(OffsetDateTime::now_utc()),
            moisture_low: DEFAULT_MOISTURE_LOW,
            moisture_high: DEFAULT_MOISTURE_HIGH,
            notifications_enabled: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn test_reading(moisture: f64, temperature: f64, humidity: f64, dht_error: bool) -> Reading {
        Reading {
            id: 1,
            device_id: "dev1".to_string(),
            soil_moisture: moisture,
            temperature,
            humidity,
            pump_status: false,
            dht_error,
            time: OffsetDateTime::from_unix_timestamp(1609459200).unwrap(),
        }
    }

    #[test]
    fn test_in_range_reading_raises_nothing() {
        let reading = test_reading(45.0, 22.0, 55.0, false);
        assert!(evaluate(&reading, &test_device()).is_none());
    }

    #[test]
    fn test_single_violation() {
        let reading = test_reading(10.0, 22.0, 55.0, false);
        let alert = evaluate(&reading, &test_device()).unwrap();

        assert_eq!(alert.message, "Soil moisture critically low: 10%");
        assert_eq!(alert.alert_type, "abnormal_readings");
        assert_eq!(alert.soil_moisture, 10.0);
    }

    #[test]
    fn test_multiple_violations_produce_one_alert() {
        let reading = test_reading(10.0, 45.0, 95.0, false);
        let alert = evaluate(&reading, &test_device()).unwrap();

        assert!(alert.message.contains("Soil moisture critically low"));
        assert!(alert.message.contains("Temperature outside normal range"));
        assert!(alert.message.contains("Humidity outside normal range"));
    }

    #[test]
    fn test_dht_error_checks_moisture_only() {
        // Zeroed temperature/humidity would violate the ranges, but the
        // sample is flagged as malfunctioning so only moisture counts.
        let reading = test_reading(50.0, 0.0, 0.0, true);
        assert!(evaluate(&reading, &test_device()).is_none());

        let reading = test_reading(15.0, 0.0, 0.0, true);
        let alert = evaluate(&reading, &test_device()).unwrap();
        assert_eq!(alert.message, "Soil moisture critically low: 15%");
    }

    #[test]
    fn test_boundary_values_are_in_range() {
        let reading = test_reading(20.0, 10.0, 20.0, false);
        assert!(evaluate(&reading, &test_device()).is_none());

        let reading = test_reading(100.0, 40.0, 90.0, false);
        assert!(evaluate(&reading, &test_device()).is_none());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let reading = test_reading(10.0, 45.0, 95.0, false);
        let device = test_device();

        let first = evaluate(&reading, &device).unwrap();
        let second = evaluate(&reading, &device).unwrap();

        assert_eq!(first.message, second.message);
        assert_eq!(first.timestamp, second.timestamp);
    }
}

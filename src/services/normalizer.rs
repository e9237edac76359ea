use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::errors::MessageError;
use crate::models::Reading;
use crate::services::alert_evaluator::DeviceAlert;

/// Out-of-band magic number firmware reports when the DHT sensor fails to
/// produce a measurement.
pub const DHT_SENTINEL: f64 = -999.0;

/// Device id reported when a payload carries none of the known id keys.
pub const UNKNOWN_DEVICE_ID: &str = "unknown";

/// Inbound topic families. The two sensor kinds carry different historical
/// payload formats; both normalize through the same alias tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    SensorData,
    SensorsData,
    Status,
    Alert,
}

/// A fully resolved inbound message, ready for its pipeline path.
#[derive(Debug, Clone)]
pub enum Inbound {
    Reading(Reading),
    Status { device_id: String },
    Alert(DeviceAlert),
}

// Candidate payload keys per canonical field, in priority order. Firmware
// revisions renamed fields over time; the first present key wins. New
// formats extend these lists instead of adding branches.
const DEVICE_ID_KEYS: &[&str] = &["device_id", "deviceId", "id"];
const MOISTURE_KEYS: &[&str] = &["soil_moisture", "soilMoisture", "moisture"];
const TEMPERATURE_KEYS: &[&str] = &["temperature", "temp"];
const HUMIDITY_KEYS: &[&str] = &["humidity", "humid"];
const PUMP_KEYS: &[&str] = &["pump_status", "pumpStatus", "pump"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp"];
const DHT_ERROR_KEYS: &[&str] = &["dht_error", "dhtError"];
const ALERT_TYPE_KEYS: &[&str] = &["type"];
const ALERT_MESSAGE_KEYS: &[&str] = &["message"];
const STATUS_KEYS: &[&str] = &["status"];

/// Normalize a parsed payload into a canonical inbound message. Pure: every
/// missing field resolves to its documented default, so downstream steps
/// never see partial data.
pub fn normalize(kind: TopicKind, raw: &Value) -> Result<Inbound, MessageError> {
    match kind {
        TopicKind::SensorData | TopicKind::SensorsData => {
            Ok(Inbound::Reading(normalize_reading(raw)))
        }
        TopicKind::Status => normalize_status(raw),
        TopicKind::Alert => Ok(Inbound::Alert(normalize_alert(raw))),
    }
}

fn normalize_reading(raw: &Value) -> Reading {
    let mut temperature = resolve_f64(raw, TEMPERATURE_KEYS).unwrap_or(0.0);
    let mut humidity = resolve_f64(raw, HUMIDITY_KEYS).unwrap_or(0.0);

    // The sentinel means "sensor read failed", not a measurement: zero the
    // field and flag the sample instead of storing the magic number.
    let mut dht_error = resolve_bool(raw, DHT_ERROR_KEYS).unwrap_or(false);
    if temperature == DHT_SENTINEL {
        temperature = 0.0;
        dht_error = true;
    }
    if humidity == DHT_SENTINEL {
        humidity = 0.0;
        dht_error = true;
    }

    Reading {
        id: 0,
        device_id: resolve_str(raw, DEVICE_ID_KEYS)
            .unwrap_or(UNKNOWN_DEVICE_ID)
            .to_string(),
        soil_moisture: resolve_f64(raw, MOISTURE_KEYS).unwrap_or(0.0).max(0.0),
        temperature,
        humidity,
        pump_status: resolve_bool(raw, PUMP_KEYS).unwrap_or(false),
        dht_error,
        time: resolve_timestamp(raw, TIMESTAMP_KEYS),
    }
}

fn normalize_status(raw: &Value) -> Result<Inbound, MessageError> {
    let status = resolve_str(raw, STATUS_KEYS).unwrap_or_default();

    if status != "connected" {
        return Err(MessageError::IgnoredStatus(status.to_string()));
    }

    Ok(Inbound::Status {
        device_id: resolve_str(raw, DEVICE_ID_KEYS)
            .unwrap_or(UNKNOWN_DEVICE_ID)
            .to_string(),
    })
}

fn normalize_alert(raw: &Value) -> DeviceAlert {
    let device_id = resolve_str(raw, DEVICE_ID_KEYS)
        .unwrap_or(UNKNOWN_DEVICE_ID)
        .to_string();

    DeviceAlert {
        device_name: device_id.clone(),
        device_id,
        alert_type: resolve_str(raw, ALERT_TYPE_KEYS).unwrap_or("unknown").to_string(),
        message: resolve_str(raw, ALERT_MESSAGE_KEYS)
            .unwrap_or("No details provided")
            .to_string(),
        soil_moisture: resolve_f64(raw, MOISTURE_KEYS).unwrap_or(0.0),
        temperature: resolve_f64(raw, TEMPERATURE_KEYS).unwrap_or(0.0),
        humidity: resolve_f64(raw, HUMIDITY_KEYS).unwrap_or(0.0),
        timestamp: resolve_timestamp(raw, TIMESTAMP_KEYS),
    }
}

fn resolve<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| raw.get(key)).filter(|v| !v.is_null())
}

fn resolve_str<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    resolve(raw, keys).and_then(Value::as_str)
}

fn resolve_f64(raw: &Value, keys: &[&str]) -> Option<f64> {
    resolve(raw, keys).and_then(Value::as_f64)
}

fn resolve_bool(raw: &Value, keys: &[&str]) -> Option<bool> {
    resolve(raw, keys).and_then(Value::as_bool)
}

/// Timestamps arrive as unix seconds, unix milliseconds, or an RFC 3339
/// string depending on firmware; anything unreadable falls back to the
/// server clock.
fn resolve_timestamp(raw: &Value, keys: &[&str]) -> OffsetDateTime {
    match resolve(raw, keys) {
        Some(Value::Number(n)) => {
            let raw_ts = n.as_f64().unwrap_or(0.0);
            let seconds = if raw_ts.abs() >= 1e12 { raw_ts / 1000.0 } else { raw_ts };
            OffsetDateTime::from_unix_timestamp(seconds as i64)
                .unwrap_or_else(|_| OffsetDateTime::now_utc())
        }
        Some(Value::String(s)) => OffsetDateTime::parse(s, &Rfc3339)
            .unwrap_or_else(|_| OffsetDateTime::now_utc()),
        _ => OffsetDateTime::now_utc(),
    }
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::errors::{ApiError, DeviceError};
use crate::repositories::{DeviceRepository, ReadingRepository};
use crate::services::CommandDispatcher;

const DEFAULT_READINGS_LIMIT: i64 = 100;
const MAX_READINGS_LIMIT: i64 = 1000;

#[derive(Clone)]
pub struct DeviceState {
    pub devices: Arc<DeviceRepository>,
    pub readings: Arc<ReadingRepository>,
    pub dispatcher: Arc<CommandDispatcher>,
}

pub fn device_router(state: DeviceState) -> Router {
    Router::new()
        .route("/", get(get_devices).post(upsert_device))
        .route("/:device_id", get(get_device).delete(delete_device))
        .route("/:device_id/settings", patch(update_device_settings))
        .route("/:device_id/mode", patch(update_device_mode))
        .route("/:device_id/pump", post(control_pump))
        .route("/:device_id/readings", get(get_device_readings))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDeviceBody {
    pub device_id: String,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsBody {
    pub moisture_threshold_low: Option<f64>,
    pub moisture_threshold_high: Option<f64>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeBody {
    pub auto_mode: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpBody {
    pub status: bool,
    pub auto_mode: Option<bool>,
}

#[derive(Deserialize)]
pub struct ReadingsQuery {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
    pub limit: Option<i64>,
}

pub async fn get_devices(State(state): State<DeviceState>) -> Result<impl IntoResponse, ApiError> {
    let devices = state.devices.all().await?;

    Ok(Json(devices))
}

pub async fn get_device(
    Path(device_id): Path<String>,
    State(state): State<DeviceState>,
) -> Result<impl IntoResponse, ApiError> {
    let device = state
        .devices
        .find_by_device_id(&device_id)
        .await?
        .ok_or(DeviceError::DeviceNotFound)?;

    Ok(Json(device))
}

/// Administrative create-or-update; auto-provisioning via sightings covers
/// the common case, this exists for pre-registering and renaming devices.
pub async fn upsert_device(
    State(state): State<DeviceState>,
    Json(body): Json<UpsertDeviceBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.device_id.is_empty() || body.name.is_empty() {
        return Err(DeviceError::InvalidRequest.into());
    }

    let updated = state
        .devices
        .update_profile(&body.device_id, &body.name, body.location.as_deref())
        .await?;

    let device = match updated {
        Some(device) => device,
        None => {
            state
                .devices
                .create(&body.device_id, &body.name, body.location.as_deref())
                .await?
        }
    };

    Ok(Json(device))
}

pub async fn update_device_settings(
    Path(device_id): Path<String>,
    State(state): State<DeviceState>,
    Json(body): Json<SettingsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let device = state
        .devices
        .update_settings(
            &device_id,
            body.moisture_threshold_low,
            body.moisture_threshold_high,
            body.notifications_enabled,
        )
        .await?;

    Ok(Json(device))
}

pub async fn update_device_mode(
    Path(device_id): Path<String>,
    State(state): State<DeviceState>,
    Json(body): Json<ModeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let device = state
        .devices
        .set_mode(&device_id, body.auto_mode)
        .await?
        .ok_or(DeviceError::DeviceNotFound)?;

    Ok(Json(device))
}

pub async fn control_pump(
    Path(device_id): Path<String>,
    State(state): State<DeviceState>,
    Json(body): Json<PumpBody>,
) -> Result<impl IntoResponse, ApiError> {
    let ack = state
        .dispatcher
        .dispatch(&device_id, body.status, body.auto_mode)
        .await?;

    Ok(Json(ack))
}

pub async fn delete_device(
    Path(device_id): Path<String>,
    State(state): State<DeviceState>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.devices.delete(&device_id).await? {
        return Err(DeviceError::DeviceNotFound.into());
    }

    Ok(Json(json!({ "message": "Device deleted successfully" })))
}

pub async fn get_device_readings(
    Path(device_id): Path<String>,
    Query(range): Query<ReadingsQuery>,
    State(state): State<DeviceState>,
) -> Result<impl IntoResponse, ApiError> {
    let end = range.end.unwrap_or_else(OffsetDateTime::now_utc);
    let start = range.start.unwrap_or(end - time::Duration::days(1));
    let limit = range
        .limit
        .unwrap_or(DEFAULT_READINGS_LIMIT)
        .clamp(1, MAX_READINGS_LIMIT);

    let readings = state
        .readings
        .find_by_device_id_and_time_range(&device_id, start, end, limit)
        .await?;

    Ok(Json(readings))
}

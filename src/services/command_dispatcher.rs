use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, DeviceError, MessageError};
use crate::repositories::{DeviceRepository, EventRepository};
use crate::services::transport::{ClientEvent, MessageRouter};

/// Outbound pump command as published on the device channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpCommand {
    pub device_id: String,
    pub pump: bool,
    pub auto: bool,
}

/// Resolved state reported back to the caller of a control operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpAck {
    pub device_id: String,
    pub pump_status: bool,
    pub auto_mode: bool,
    pub message: String,
}

/// Seam to the outbound device channel. The MQTT service is the production
/// implementation; tests substitute their own.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send_pump_command(&self, command: &PumpCommand) -> Result<(), MessageError>;
}

/// Turns a pump-control intent into a durable mode change plus a
/// best-effort device command. Mode is the registry fact; the pump bit is
/// transient and reconciled by the device's next sensor reading.
pub struct CommandDispatcher {
    devices: Arc<DeviceRepository>,
    events: Arc<EventRepository>,
    transport: Arc<dyn CommandTransport>,
    router: Arc<MessageRouter>,
}

impl CommandDispatcher {
    pub fn new(
        devices: Arc<DeviceRepository>,
        events: Arc<EventRepository>,
        transport: Arc<dyn CommandTransport>,
        router: Arc<MessageRouter>,
    ) -> Self {
        Self {
            devices,
            events,
            transport,
            router,
        }
    }

    /// Control intents never provision devices: an unknown id is a
    /// `NotFound`, with nothing emitted or broadcast. A transport failure
    /// surfaces to the caller, but the mode change already persisted stays,
    /// and the pump-status broadcast still goes out so the dashboard
    /// reflects the attempted state.
    pub async fn dispatch(
        &self,
        device_id: &str,
        pump_on: bool,
        auto_mode: Option<bool>,
    ) -> Result<PumpAck, ApiError> {
        let device = self
            .devices
            .find_by_device_id(device_id)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        let resolved_auto = auto_mode.unwrap_or(device.auto_mode);

        if let Some(mode) = auto_mode {
            self.devices
                .set_mode(device_id, mode)
                .await?
                .ok_or(DeviceError::DeviceNotFound)?;
        }

        let command = PumpCommand {
            device_id: device_id.to_string(),
            pump: pump_on,
            auto: resolved_auto,
        };

        if let Err(e) = self.events.log("pump_command", &command).await {
            tracing::warn!("failed to record pump command for {}: {}", device_id, e);
        }

        let transport_result = self.transport.send_pump_command(&command).await;

        self.router
            .broadcast(ClientEvent::PumpStatus {
                device_id: device_id.to_string(),
                pump_status: pump_on,
                auto_mode: resolved_auto,
            })
            .await;

        transport_result?;

        Ok(PumpAck {
            device_id: device_id.to_string(),
            pump_status: pump_on,
            auto_mode: resolved_auto,
            message: format!("Pump turned {}", if pump_on { "ON" } else { "OFF" }),
        })
    }
}

use std::sync::Arc;

use serde_json::Value;

use crate::errors::MessageError;
use crate::models::Reading;
use crate::repositories::{DeviceRepository, EventRepository, ReadingRepository};
use crate::services::alert_evaluator::{self, DeviceAlert};
use crate::services::normalizer::{self, Inbound, TopicKind};
use crate::services::notify_service::NotificationGateway;
use crate::services::transport::{ClientEvent, MessageRouter};

/// Orchestrates one inbound device message at a time:
/// parse → normalize → persist → sync registry → evaluate → fan out.
/// Failures past persistence are contained and logged so ingestion keeps
/// flowing when a downstream concern breaks.
pub struct IngestService {
    devices: Arc<DeviceRepository>,
    readings: Arc<ReadingRepository>,
    events: Arc<EventRepository>,
    router: Arc<MessageRouter>,
    notifier: Arc<dyn NotificationGateway>,
}

impl IngestService {
    pub fn new(
        devices: Arc<DeviceRepository>,
        readings: Arc<ReadingRepository>,
        events: Arc<EventRepository>,
        router: Arc<MessageRouter>,
        notifier: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            devices,
            readings,
            events,
            router,
            notifier,
        }
    }

    /// Single ingress for every inbound topic. An `Err` is a rejected
    /// message: the caller logs it and drops the message, redelivery being
    /// the transport's concern.
    pub async fn ingest(&self, kind: TopicKind, payload: &[u8]) -> Result<(), MessageError> {
        let raw: Value = serde_json::from_slice(payload)?;

        match normalizer::normalize(kind, &raw)? {
            Inbound::Reading(reading) => self.handle_reading(reading).await,
            Inbound::Status { device_id } => self.handle_status(&device_id).await,
            Inbound::Alert(alert) => self.handle_alert(alert).await,
        }
    }

    /// Full path: the reading is the durable outcome; a registry or
    /// notification failure after the store write never rolls it back.
    async fn handle_reading(&self, reading: Reading) -> Result<(), MessageError> {
        let stored = self.readings.create(&reading).await?;

        let device = match self.devices.upsert_on_sighting(&stored.device_id).await {
            Ok(device) => Some(device),
            Err(e) => {
                // Retried implicitly by the next sighting
                tracing::error!(
                    "device sighting update failed for {}: {}",
                    stored.device_id,
                    e
                );
                None
            }
        };

        if let Some(device) = device {
            if let Some(alert) = alert_evaluator::evaluate(&stored, &device) {
                if device.notifications_enabled {
                    self.dispatch_alert(alert).await;
                } else {
                    tracing::debug!(
                        "alert suppressed for {}: notifications disabled",
                        device.device_id
                    );
                }
            }
        }

        self.router.broadcast(ClientEvent::SensorData(stored)).await;

        Ok(())
    }

    /// Reduced path for status messages: no reading, no evaluation.
    async fn handle_status(&self, device_id: &str) -> Result<(), MessageError> {
        match self.devices.mark_seen(device_id).await {
            Ok(Some(_)) => {}
            Ok(None) => tracing::debug!("status from unregistered device {}", device_id),
            Err(e) => tracing::error!("status update failed for {}: {}", device_id, e),
        }

        self.router
            .broadcast(ClientEvent::DeviceStatus {
                device_id: device_id.to_string(),
                is_online: true,
            })
            .await;

        Ok(())
    }

    /// Device-originated alerts bypass the reading store entirely.
    async fn handle_alert(&self, mut alert: DeviceAlert) -> Result<(), MessageError> {
        match self.devices.find_by_device_id(&alert.device_id).await {
            Ok(Some(device)) => {
                alert.device_name = device.name.clone();

                if device.notifications_enabled {
                    self.dispatch_alert(alert.clone()).await;
                }
            }
            Ok(None) => tracing::debug!("alert from unknown device {}", alert.device_id),
            Err(e) => tracing::error!("device lookup failed for alert: {}", e),
        }

        self.router
            .broadcast(ClientEvent::DeviceAlert {
                device_id: alert.device_id,
                alert_type: alert.alert_type,
                message: alert.message,
                timestamp: alert.timestamp,
            })
            .await;

        Ok(())
    }

    /// Hand an alert to the notification gateway on a detached task. The
    /// pipeline does not await delivery, and a gateway failure stays inside
    /// the task.
    async fn dispatch_alert(&self, alert: DeviceAlert) {
        if let Err(e) = self.events.log("device_alert", &alert).await {
            tracing::warn!("failed to record alert for {}: {}", alert.device_id, e);
        }

        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_alert(&alert).await {
                tracing::warn!("alert delivery failed for {}: {}", alert.device_id, e);
            }
        });
    }
}

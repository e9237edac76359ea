use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::configs::Notifier;
use crate::errors::MessageError;
use crate::services::alert_evaluator::DeviceAlert;

/// Out-of-band alert delivery boundary. Implementations must contain their
/// own failures; callers dispatch alerts fire-and-forget and never block
/// ingestion on delivery.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_alert(&self, alert: &DeviceAlert) -> Result<(), MessageError>;
}

/// Delivers alerts as email through an HTTP mail relay.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    recipient: String,
}

impl HttpMailer {
    /// Returns `None` when no relay endpoint is configured; the caller
    /// should fall back to [`NoopGateway`].
    pub fn from_settings(notifier: &Notifier) -> Option<Self> {
        let endpoint = notifier.endpoint.clone()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(notifier.timeout_ms))
            .build()
            .ok()?;

        Some(Self {
            client,
            endpoint,
            recipient: notifier.recipient.clone(),
        })
    }

    fn render_subject(alert: &DeviceAlert) -> String {
        if alert.alert_type == "abnormal_readings" {
            format!("Alert: Abnormal readings from {}", alert.device_name)
        } else {
            format!("Alert: {} from {}", alert.alert_type, alert.device_name)
        }
    }

    fn render_body(alert: &DeviceAlert) -> String {
        format!(
            "<h2>Alert: {}</h2>\
             <p><strong>Device:</strong> {} ({})</p>\
             <p><strong>Time:</strong> {}</p>\
             <h3>Details:</h3>\
             <p>{}</p>\
             <h3>Current Readings:</h3>\
             <ul>\
             <li>Soil Moisture: {}%</li>\
             <li>Temperature: {}°C</li>\
             <li>Humidity: {}%</li>\
             </ul>\
             <p>Please check your irrigation system and sensors.</p>",
            alert.alert_type,
            alert.device_name,
            alert.device_id,
            alert.timestamp,
            alert.message,
            alert.soil_moisture,
            alert.temperature,
            alert.humidity,
        )
    }
}

#[async_trait]
impl NotificationGateway for HttpMailer {
    async fn send_alert(&self, alert: &DeviceAlert) -> Result<(), MessageError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "to": self.recipient,
                "subject": Self::render_subject(alert),
                "html": Self::render_body(alert),
            }))
            .send()
            .await
            .map_err(|e| MessageError::Transport(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| MessageError::Transport(e.to_string()))?;

        tracing::info!("alert email dispatched for device {}", alert.device_id);

        Ok(())
    }
}

/// Used when no relay endpoint is configured: alerts are logged and dropped.
pub struct NoopGateway;

#[async_trait]
impl NotificationGateway for NoopGateway {
    async fn send_alert(&self, alert: &DeviceAlert) -> Result<(), MessageError> {
        tracing::warn!(
            "no notification endpoint configured, dropping alert for {}: {}",
            alert.device_id,
            alert.message
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn sample_alert() -> DeviceAlert {
        DeviceAlert {
            device_id: "dev1".to_string(),
            device_name: "Greenhouse North".to_string(),
            alert_type: "abnormal_readings".to_string(),
            message: "Soil moisture critically low: 10%".to_string(),
            soil_moisture: 10.0,
            temperature: 22.0,
            humidity: 55.0,
            timestamp: OffsetDateTime::from_unix_timestamp(1609459200).unwrap(),
        }
    }

    #[test]
    fn test_subject_for_range_alerts() {
        assert_eq!(
            HttpMailer::render_subject(&sample_alert()),
            "Alert: Abnormal readings from Greenhouse North"
        );
    }

    #[test]
    fn test_subject_for_device_alerts() {
        let mut alert = sample_alert();
        alert.alert_type = "pump_failure".to_string();

        assert_eq!(
            HttpMailer::render_subject(&alert),
            "Alert: pump_failure from Greenhouse North"
        );
    }

    #[test]
    fn test_body_contains_readings_and_message() {
        let body = HttpMailer::render_body(&sample_alert());

        assert!(body.contains("Greenhouse North"));
        assert!(body.contains("dev1"));
        assert!(body.contains("Soil Moisture: 10%"));
        assert!(body.contains("Temperature: 22°C"));
        assert!(body.contains("Soil moisture critically low"));
    }

    #[test]
    fn test_mailer_requires_endpoint() {
        let notifier = Notifier {
            endpoint: None,
            recipient: "ops@example.com".to_string(),
            timeout_ms: 1000,
        };

        assert!(HttpMailer::from_settings(&notifier).is_none());
    }
}

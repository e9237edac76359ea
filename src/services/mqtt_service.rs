use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use crate::configs::{Gateway, GatewayTopic};
use crate::errors::MessageError;
use crate::services::command_dispatcher::{CommandTransport, PumpCommand};
use crate::services::ingest_service::IngestService;
use crate::services::normalizer::TopicKind;

/// Connection to the device-facing MQTT broker: subscribes the inbound
/// topics and feeds every publish into the ingestion pipeline, and carries
/// outbound pump commands.
pub struct MqttService {
    client: AsyncClient,
    topics: GatewayTopic,
    command_timeout: Duration,
}

impl MqttService {
    pub async fn connect(
        gateway: &Gateway,
        ingest: Arc<IngestService>,
    ) -> Result<Arc<Self>, MessageError> {
        let mut options = MqttOptions::new(&gateway.client_id, &gateway.host, gateway.port);
        options.set_keep_alive(Duration::from_secs(5));

        if let Some(auth) = &gateway.auth {
            options.set_credentials(&auth.username, &auth.password);
        }

        let (client, event_loop) = AsyncClient::new(options, 10);

        for topic in [
            &gateway.topic.sensor_data,
            &gateway.topic.sensors_data,
            &gateway.topic.status,
            &gateway.topic.alerts,
        ] {
            client
                .subscribe(topic, QoS::AtLeastOnce)
                .await
                .map_err(|e| MessageError::Transport(e.to_string()))?;

            tracing::debug!("subscribe topic {}", topic);
        }

        let service = Arc::new(Self {
            client,
            topics: gateway.topic.clone(),
            command_timeout: Duration::from_millis(gateway.command_timeout_ms),
        });

        tokio::spawn(Self::poll_loop(
            event_loop,
            gateway.topic.clone(),
            ingest,
        ));

        Ok(service)
    }

    async fn poll_loop(mut event_loop: EventLoop, topics: GatewayTopic, ingest: Arc<IngestService>) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Some(kind) = kind_for(&topics, &publish.topic) else {
                        tracing::warn!("publish on unhandled topic {}", publish.topic);
                        continue;
                    };

                    if let Err(e) = ingest.ingest(kind, &publish.payload).await {
                        tracing::warn!("message on {} rejected: {}", publish.topic, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

fn kind_for(topics: &GatewayTopic, topic: &str) -> Option<TopicKind> {
    if topic == topics.sensor_data {
        Some(TopicKind::SensorData)
    } else if topic == topics.sensors_data {
        Some(TopicKind::SensorsData)
    } else if topic == topics.status {
        Some(TopicKind::Status)
    } else if topic == topics.alerts {
        Some(TopicKind::Alert)
    } else {
        None
    }
}

#[async_trait]
impl CommandTransport for MqttService {
    /// Publish at least once, bounded by the configured timeout so a dead
    /// broker degrades to an error instead of hanging the caller's HTTP
    /// response.
    async fn send_pump_command(&self, command: &PumpCommand) -> Result<(), MessageError> {
        let payload = serde_json::to_vec(command)?;

        tokio::time::timeout(
            self.command_timeout,
            self.client
                .publish(&self.topics.pump_control, QoS::AtLeastOnce, false, payload),
        )
        .await
        .map_err(|_| MessageError::Timeout)?
        .map_err(|e| MessageError::Transport(e.to_string()))
    }
}

mod websocket;

pub use websocket::*;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::models::Reading;

/// Server-to-client events on the real-time dashboard feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    SensorData(Reading),
    DeviceStatus {
        device_id: String,
        is_online: bool,
    },
    PumpStatus {
        device_id: String,
        pump_status: bool,
        auto_mode: bool,
    },
    DeviceAlert {
        device_id: String,
        alert_type: String,
        message: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
}

/// Client-to-server intents on the same connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    ControlPump {
        device_id: String,
        pump_status: bool,
        auto_mode: Option<bool>,
    },
}

/// Fanout hub for connected dashboard clients. Subscribers come and go with
/// their WebSocket connections; a broadcast tolerates subscribers that
/// disconnected mid-iteration and prunes their channels.
pub struct MessageRouter {
    subscribers: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<ClientEvent>>>>,
    command_tx: mpsc::UnboundedSender<ClientCommand>,
}

impl MessageRouter {
    /// Returns the router plus the receiving end of the control-intent
    /// channel; the application drains it into the command dispatcher.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        (
            Self {
                subscribers: Arc::new(RwLock::new(HashMap::new())),
                command_tx,
            },
            command_rx,
        )
    }

    pub async fn subscribe(&self) -> (String, mpsc::UnboundedReceiver<ClientEvent>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers.write().await.insert(id.clone(), tx);
        (id, rx)
    }

    pub async fn unsubscribe(&self, subscription_id: &str) {
        self.subscribers.write().await.remove(subscription_id);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn broadcast(&self, event: ClientEvent) {
        let disconnected: Vec<String> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .filter(|(_, sender)| sender.send(event.clone()).is_err())
                .map(|(id, _)| id.clone())
                .collect()
        };

        if !disconnected.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in disconnected {
                tracing::debug!("pruning disconnected subscriber {}", id);
                subscribers.remove(&id);
            }
        }
    }

    /// Route a control intent from a connected client towards the command
    /// dispatcher.
    pub fn process_incoming(&self, command: ClientCommand) {
        if self.command_tx.send(command).is_err() {
            tracing::error!("command channel closed, dropping control intent");
        }
    }
}

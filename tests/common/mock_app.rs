use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tokio::sync::Mutex;

use irrisync_server::configs::{Database, SchemaManager, Storage};
use irrisync_server::errors::MessageError;
use irrisync_server::handles::{DeviceState, device_router};
use irrisync_server::repositories::{DeviceRepository, EventRepository, ReadingRepository};
use irrisync_server::services::{
    CommandDispatcher, CommandTransport, MessageRouter, PumpCommand,
};

/// Outbound command channel double: records published commands, or fails
/// every publish when constructed with `fail`.
pub struct RecordingTransport {
    pub sent: Mutex<Vec<PumpCommand>>,
    fail: bool,
}

#[async_trait]
impl CommandTransport for RecordingTransport {
    async fn send_pump_command(&self, command: &PumpCommand) -> Result<(), MessageError> {
        if self.fail {
            return Err(MessageError::Transport("broker unreachable".to_string()));
        }

        self.sent.lock().await.push(command.clone());
        Ok(())
    }
}

pub struct MockApp {
    pub storage: Arc<Storage>,
    pub devices: Arc<DeviceRepository>,
    pub readings: Arc<ReadingRepository>,
    pub transport: Arc<RecordingTransport>,
    pub router: Router,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_transport(false).await
    }

    pub async fn with_failing_transport() -> Self {
        Self::with_transport(true).await
    }

    async fn with_transport(fail: bool) -> Self {
        let storage = Arc::new(
            Storage::new(
                Database {
                    migration_path: None,
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );

        let devices = Arc::new(DeviceRepository::new(storage.clone()));
        let readings = Arc::new(ReadingRepository::new(storage.clone()));
        let events = Arc::new(EventRepository::new(storage.clone()));

        let (message_router, _command_rx) = MessageRouter::new();
        let message_router = Arc::new(message_router);

        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
            fail,
        });

        let dispatcher = Arc::new(CommandDispatcher::new(
            devices.clone(),
            events,
            transport.clone(),
            message_router,
        ));

        let router = Router::new().nest(
            "/api/devices",
            device_router(DeviceState {
                devices: devices.clone(),
                readings: readings.clone(),
                dispatcher,
            }),
        );

        Self {
            storage,
            devices,
            readings,
            transport,
            router,
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::{Monitor, SchemaManager, Settings, Storage};
use crate::handles::{DeviceState, device_router};
use crate::repositories::{DeviceRepository, EventRepository, ReadingRepository};
use crate::services::{
    ClientCommand, ClientEvent, CommandDispatcher, CommandTransport, HttpMailer, IngestService,
    MessageRouter, MqttService, NoopGateway, NotificationGateway, WebSocketState,
    websocket_router,
};

pub async fn create_app(settings: &Arc<Settings>) -> Router {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .unwrap(),
    );

    let devices = Arc::new(DeviceRepository::new(storage.clone()));
    let readings = Arc::new(ReadingRepository::new(storage.clone()));
    let events = Arc::new(EventRepository::new(storage.clone()));

    let (message_router, command_rx) = MessageRouter::new();
    let message_router = Arc::new(message_router);

    let notifier: Arc<dyn NotificationGateway> =
        match HttpMailer::from_settings(&settings.notifier) {
            Some(mailer) => Arc::new(mailer),
            None => Arc::new(NoopGateway),
        };

    let ingest = Arc::new(IngestService::new(
        devices.clone(),
        readings.clone(),
        events.clone(),
        message_router.clone(),
        notifier,
    ));

    let mqtt = MqttService::connect(&settings.gateway, ingest.clone())
        .await
        .unwrap();
    let transport: Arc<dyn CommandTransport> = mqtt;

    let dispatcher = Arc::new(CommandDispatcher::new(
        devices.clone(),
        events.clone(),
        transport,
        message_router.clone(),
    ));

    spawn_command_drain(command_rx, dispatcher.clone());
    spawn_liveness_sweep(
        devices.clone(),
        message_router.clone(),
        settings.monitor.clone(),
    );

    let api = Router::new().nest(
        "/devices",
        device_router(DeviceState {
            devices,
            readings,
            dispatcher,
        }),
    );

    Router::new()
        .nest("/api", api)
        .merge(websocket_router(WebSocketState {
            router: message_router,
        }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Control intents from WebSocket clients flow into the same dispatcher as
/// the REST pump route.
fn spawn_command_drain(
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    dispatcher: Arc<CommandDispatcher>,
) {
    tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            let ClientCommand::ControlPump {
                device_id,
                pump_status,
                auto_mode,
            } = command;

            if let Err(e) = dispatcher.dispatch(&device_id, pump_status, auto_mode).await {
                tracing::warn!("pump control from client failed for {}: {}", device_id, e);
            }
        }
    });
}

/// Marks devices offline once they stop reporting and tells the dashboards.
fn spawn_liveness_sweep(
    devices: Arc<DeviceRepository>,
    message_router: Arc<MessageRouter>,
    monitor: Monitor,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(monitor.sweep_interval_secs));

        loop {
            ticker.tick().await;

            let cutoff =
                OffsetDateTime::now_utc() - time::Duration::seconds(monitor.offline_after_secs as i64);

            let stale = match devices.find_stale(cutoff).await {
                Ok(stale) => stale,
                Err(e) => {
                    tracing::error!("liveness sweep failed: {}", e);
                    continue;
                }
            };

            for device in stale {
                if let Err(e) = devices.mark_offline(&device.device_id).await {
                    tracing::error!("failed to mark {} offline: {}", device.device_id, e);
                    continue;
                }

                tracing::info!("device {} went offline", device.device_id);

                message_router
                    .broadcast(ClientEvent::DeviceStatus {
                        device_id: device.device_id,
                        is_online: false,
                    })
                    .await;
            }
        }
    });
}

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::services::transport::{ClientCommand, MessageRouter};

#[derive(Clone)]
pub struct WebSocketState {
    pub router: Arc<MessageRouter>,
}

pub fn websocket_router(state: WebSocketState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: WebSocketState) {
    let client_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    let (subscription_id, mut events) = state.router.subscribe().await;

    tracing::info!("WebSocket client {} connected", client_id);

    let client_id_send = client_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("failed to serialize event: {}", e);
                    continue;
                }
            };

            if sender.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
        tracing::info!("WebSocket client {} send task ended", client_id_send);
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(command) => {
                    state.router.process_incoming(command);
                }
                Err(e) => {
                    tracing::warn!("Failed to deserialize client message: {:?}", e);
                }
            },
            Ok(WsMessage::Close(_)) => {
                tracing::info!("WebSocket client {} closed", client_id);
                break;
            }
            Err(e) => {
                tracing::warn!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    state.router.unsubscribe(&subscription_id).await;

    tracing::info!("WebSocket client {} disconnected", client_id);
}

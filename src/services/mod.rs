pub mod alert_evaluator;
pub mod command_dispatcher;
pub mod ingest_service;
pub mod mqtt_service;
pub mod normalizer;
pub mod notify_service;
pub mod transport;

pub use alert_evaluator::DeviceAlert;
pub use command_dispatcher::{CommandDispatcher, CommandTransport, PumpAck, PumpCommand};
pub use ingest_service::IngestService;
pub use mqtt_service::MqttService;
pub use normalizer::{Inbound, TopicKind};
pub use notify_service::{HttpMailer, NoopGateway, NotificationGateway};
pub use transport::{ClientCommand, ClientEvent, MessageRouter, WebSocketState, websocket_router};

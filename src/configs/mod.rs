mod schema;
mod settings;
mod storage;

pub use schema::SchemaManager;
pub use settings::{Database, Gateway, GatewayAuth, GatewayTopic, Monitor, Notifier, Settings};
pub use storage::Storage;

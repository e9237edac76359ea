use std::sync::Arc;

use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::Event;

/// Audit trail for outbound commands and raised alerts.
pub struct EventRepository {
    storage: Arc<Storage>,
}

impl EventRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn log<T: serde::Serialize>(
        &self,
        event_type: &str,
        payload: &T,
    ) -> Result<Event, Error> {
        let payload = serde_json::to_string(payload)
            .map_err(|e| Error::Encode(Box::new(e)))?;

        let event: Event = sqlx::query_as(
            r#"
            INSERT INTO events (event_type, payload, time)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(event_type)
        .bind(payload)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.storage.get_pool())
        .await?;

        Ok(event)
    }

    pub async fn find_latest_by_type(
        &self,
        event_type: &str,
        limit: i64,
    ) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE event_type = $1
            ORDER BY time DESC
            LIMIT $2
            "#,
        )
        .bind(event_type)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::configs::{Database, SchemaManager};

    use super::*;

    #[tokio::test]
    async fn test_log_and_find() {
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
        let repo = EventRepository::new(storage);

        repo.log("pump_command", &json!({"device_id": "dev1", "pump": true}))
            .await
            .unwrap();

        let events = repo.find_latest_by_type("pump_command", 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].payload.contains("dev1"));

        assert!(repo.find_latest_by_type("alert", 10).await.unwrap().is_empty());
    }
}

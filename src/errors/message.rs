use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Ignored status: {0}")]
    IgnoredStatus(String),

    #[error("Reading {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Command timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl MessageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MessageError::Malformed(_) => StatusCode::BAD_REQUEST,
            MessageError::UnknownTopic(_) => StatusCode::BAD_REQUEST,
            MessageError::IgnoredStatus(_) => StatusCode::BAD_REQUEST,
            MessageError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
            MessageError::Transport(_) => StatusCode::BAD_GATEWAY,
            MessageError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            MessageError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

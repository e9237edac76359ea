use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Invalid moisture thresholds: low {low} must be below high {high}, both within 0-100")]
    InvalidThresholds { low: f64, high: f64 },

    #[error("Invalid request parameters")]
    InvalidRequest,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DeviceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeviceError::DeviceNotFound => StatusCode::NOT_FOUND,
            DeviceError::InvalidThresholds { .. } => StatusCode::BAD_REQUEST,
            DeviceError::InvalidRequest => StatusCode::BAD_REQUEST,
            DeviceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

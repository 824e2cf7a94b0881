use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for rate limiter operations
pub type Result<T> = std::result::Result<T, ReqLimitError>;

/// Rate limiter error types
#[derive(Error, Debug)]
pub enum ReqLimitError {
    /// Store unreachable or authentication rejected while connecting
    #[error("Connection error: {0}")]
    Connection(String),

    /// Runtime failure talking to the counter store. The limiter state is
    /// unknown when this is returned.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Limiter name must be unique: {0}")]
    DuplicateLimiter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReqLimitError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReqLimitError::Connection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReqLimitError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReqLimitError::DuplicateLimiter(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReqLimitError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReqLimitError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error belongs to startup configuration rather than runtime
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReqLimitError::DuplicateLimiter(_) | ReqLimitError::Config(_)
        )
    }
}

impl From<redis::RedisError> for ReqLimitError {
    fn from(err: redis::RedisError) -> Self {
        ReqLimitError::Store(err.to_string())
    }
}

impl IntoResponse for ReqLimitError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

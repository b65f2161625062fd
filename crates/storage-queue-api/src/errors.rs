//! Error types for the HTTP front door

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use storage_queue::QueueError;
use tracing::{error, warn};

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Seconds a client is asked to wait before retrying a transient failure
const DEFAULT_RETRY_AFTER_SECONDS: u64 = 5;

/// Request handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the request itself can never succeed (unreadable
///   body, rejected by validation, stale lease)
/// - `404 Not Found`: a queue the front door relies on does not exist
/// - `503 Service Unavailable`: the storage service could not be reached in
///   time, or a queue is still being deleted; the response carries a
///   `Retry-After` header
/// - `500 Internal Server Error`: everything else
///
/// Details stay in the server log. Clients get the error's display text for
/// 4xx/503 responses and a generic message for 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be turned into a name
    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },

    /// A queue operation failed
    #[error("Queue operation failed: {0}")]
    Queue(#[from] QueueError),
}

impl ApiError {
    /// HTTP status for the error, plus the retry hint if one applies
    pub fn status(&self) -> (StatusCode, Option<u64>) {
        match self {
            Self::InvalidBody { .. } => (StatusCode::BAD_REQUEST, None),
            Self::Queue(e) => match e {
                QueueError::ConnectionFailed { .. }
                | QueueError::Timeout { .. }
                | QueueError::QueueBeingDeleted { .. } => {
                    let retry_after = e
                        .retry_after()
                        .map(|d| d.num_seconds().max(1) as u64)
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECONDS);
                    (StatusCode::SERVICE_UNAVAILABLE, Some(retry_after))
                }
                e if e.is_not_found() => (StatusCode::NOT_FOUND, None),
                e if e.is_lease_lost() => (StatusCode::BAD_REQUEST, None),
                QueueError::ValidationError(_)
                | QueueError::MessageTooLarge { .. }
                | QueueError::BatchTooLarge { .. } => (StatusCode::BAD_REQUEST, None),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Internal server error occurred");
            "Internal server error occurred. Please try again later.".to_string()
        } else {
            warn!(error = %self, status = %status, "Request failed");
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut response = (status, Json(body)).into_response();

        if let Some(retry_seconds) = retry_after {
            if let Ok(header_value) = retry_seconds.to_string().parse() {
                response.headers_mut().insert("Retry-After", header_value);
            }
        }

        response
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Queue setup failed: {0}")]
    QueueSetup(#[from] QueueError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

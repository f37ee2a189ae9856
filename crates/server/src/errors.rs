use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::StorageError;
use thiserror::Error;
use tracing::error;

use crate::metrics;

/// JSON error body: `{"error": <category>, "message": <detail>}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, message: Option<String>) -> Self {
        Self { status, error, message }
    }

    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid API Object", Some(message.into()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.error,
            "message": self.message.unwrap_or_default(),
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<StorageError> for JsonApiError {
    fn from(e: StorageError) -> Self {
        if e.is_client_error() {
            return JsonApiError::invalid_object(e.to_string());
        }
        metrics::STORAGE_ERRORS_TOTAL.inc();
        error!(error = %e, "storage operation failed");
        JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Error", Some(e.to_string()))
    }
}

impl From<models::errors::ModelError> for JsonApiError {
    fn from(e: models::errors::ModelError) -> Self {
        JsonApiError::invalid_object(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_storage_errors_are_bad_requests() {
        let e = JsonApiError::from(StorageError::invalid_id("nope"));
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.error, "Invalid API Object");
    }

    #[test]
    fn backend_errors_are_server_errors() {
        let e = JsonApiError::from(StorageError::Db("socket closed".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message.as_deref(), Some("database error: socket closed"));
    }
}

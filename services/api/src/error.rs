//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;
use voicebook_core::{PortError, ReaderError};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the reading-progress operations.
    #[error("Reader Error: {0}")]
    Reader(#[from] ReaderError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No valid session accompanied the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The resource does not exist or is not visible to the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator needed for this request is not configured.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// An upstream service (speech synthesis) failed or could not be reached.
    #[error("Upstream service failed: {0}")]
    Upstream(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body returned with every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ApiError::Reader(ReaderError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_input")
            }
            ApiError::Reader(ReaderError::EmptyDocument(_)) => {
                (StatusCode::NOT_FOUND, "empty_document")
            }
            ApiError::Port(e) | ApiError::Reader(ReaderError::Persistence(e)) => match e {
                PortError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                PortError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
                PortError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!("Request failed: {}", self);
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(ErrorBody {
            error: kind.to_string(),
            message,
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_reader_errors_map_to_client_errors() {
        let invalid = ApiError::from(ReaderError::InvalidInput("page 9".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let empty = ApiError::from(ReaderError::EmptyDocument(Uuid::new_v4()));
        assert_eq!(empty.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_persistence_failures_map_to_server_error() {
        let err = ApiError::from(ReaderError::Persistence(PortError::Unexpected(
            "connection reset".into(),
        )));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upstream_failures_map_to_bad_gateway() {
        let err = ApiError::Upstream("speech service timed out".into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_port_errors() {
        let conflict = ApiError::from(PortError::Conflict("email taken".into()));
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let missing = ApiError::from(PortError::NotFound("book".into()));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}

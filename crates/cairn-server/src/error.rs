use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cairn_store::{ErrorKind, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Errors from configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable code for programmatic handling.
    pub code: &'static str,
    /// Human-readable message.
    pub error: String,
}

/// Error returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Path identifier that cannot name any stored content.
    #[error("content not found: {0}")]
    UnknownId(String),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownId(_) => ErrorKind::NotFound,
            Self::Malformed(_) => ErrorKind::MalformedRequest,
            Self::Store(e) => e.kind(),
        }
    }

    /// Stable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Denied => "ACCESS_DENIED",
            ErrorKind::MalformedRequest | ErrorKind::MismatchedIdentifier => "MALFORMED_REQUEST",
            ErrorKind::NotWritable => "NOT_WRITABLE",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Denied => StatusCode::FORBIDDEN,
            ErrorKind::MalformedRequest | ErrorKind::MismatchedIdentifier => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::NotWritable => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

//! Error types for fabryk-api

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fabryk_acl::ErrorKind;
use thiserror::Error;

/// Result type alias for fabryk-api operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fabryk-api
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from fabryk-core
    #[error("Core error: {0}")]
    Core(#[from] fabryk_core::Error),

    /// Error from fabryk-acl
    #[error(transparent)]
    Acl(#[from] fabryk_acl::Error),

    /// Malformed query string or body outside the ACL request format
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Listener or server failure
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl Error {
    /// Creates a new bad request error.
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Error::BadRequest(message.into())
    }

    /// Taxonomy bucket reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Acl(e) => e.kind(),
            Error::Core(fabryk_core::Error::InvalidId { .. }) => ErrorKind::Validation,
            Error::BadRequest(_) => ErrorKind::BadRequest,
            _ => ErrorKind::Internal,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::Index | ErrorKind::InvalidOperation => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::debug!("Request rejected ({status}): {self}");
        }
        let body = serde_json::json!({
            "error": {
                "kind": self.kind().as_str(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

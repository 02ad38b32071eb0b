use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use ncs_registry::RegistryError;
use ncs_sync::SyncError;

/// Errors that stop the server itself from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("synchronizer error: {0}")]
    Sync(#[from] SyncError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// A request-level failure: a status code and a plain-text message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        if e.is_internal() {
            error!(error = %e, "internal error while handling request");
            return Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
        match e {
            SyncError::Registry(ref inner) if inner.is_not_found() => Self::not_found(e.to_string()),
            SyncError::Closed => Self::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        SyncError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

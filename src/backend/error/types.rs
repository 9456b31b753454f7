/**
 * Backend Error Types
 *
 * Errors returned by HTTP handlers. Each variant maps to one HTTP status
 * code; engine errors keep their category through [`SyncError`].
 *
 * # Status Mapping
 *
 * - `ValidationError` - 400 Bad Request
 * - `Unauthorized` - 401 Unauthorized
 * - `NotFound` - 404 Not Found
 * - `PersistenceError` - 500 Internal Server Error
 * - `NotificationError` - 502 Bad Gateway
 * - `ConnectionError` - 503 Service Unavailable
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::realtime::AuthError;
use crate::shared::SyncError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use axum::http::StatusCode;
/// use pairchat::backend::error::BackendError;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request-level failure with an explicit status
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Shared secret missing or wrong
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message
        message: String,
    },

    /// Requested record does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message
        message: String,
    },

    /// Error from the synchronization engine
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Sync(err) => match err {
                SyncError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SyncError::SerializationError { .. } => StatusCode::BAD_REQUEST,
                SyncError::PersistenceError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SyncError::NotificationError { .. } => StatusCode::BAD_GATEWAY,
                SyncError::ConnectionError { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Unauthorized { message } => message.clone(),
            Self::NotFound { message } => message.clone(),
            Self::Sync(err) => err.to_string(),
        }
    }
}

impl From<AuthError> for BackendError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidSecret => Self::unauthorized("Invalid password"),
            AuthError::NotConfigured => {
                Self::handler(StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error")
            }
            AuthError::Store(e) => Self::Sync(e),
        }
    }
}

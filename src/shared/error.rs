//! Shared Error Types
//!
//! This module defines the error taxonomy of the synchronization engine.
//! The same enum is used by the server-side hub, the client sessions and
//! the transports, so a failure keeps its category while it crosses the
//! boundary between them.
//!
//! # Error Categories
//!
//! - `ConnectionError` - the live channel could not be established after
//!   the retry policy was exhausted. Terminal and user-visible.
//! - `PersistenceError` - a store read or write failed. Surfaced to the
//!   sender of a message, logged only for presence and read updates.
//! - `NotificationError` - the out-of-band notifier failed. Always logged,
//!   never retried.
//! - `ValidationError` - a malformed payload was rejected at the boundary.
//! - `SerializationError` - a wire payload could not be encoded or decoded.
//!
//! # Usage
//!
//! ```rust
//! use pairchat::shared::error::SyncError;
//!
//! let error = SyncError::validation("messageIds", "at least one message id is required");
//! assert!(error.is_validation());
//! ```
use thiserror::Error;

/// Errors produced anywhere in the synchronization engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The transport could not be established
    #[error("Connection error after {attempts} attempt(s): {message}")]
    ConnectionError {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Human-readable error message
        message: String,
    },

    /// A store read or write failed
    #[error("Persistence error: {message}")]
    PersistenceError {
        /// Human-readable error message
        message: String,
    },

    /// The external notifier failed
    #[error("Notification error: {message}")]
    NotificationError {
        /// Human-readable error message
        message: String,
    },

    /// A payload failed validation
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },
}

impl SyncError {
    /// Create a new connection error
    pub fn connection(attempts: u32, message: impl Into<String>) -> Self {
        Self::ConnectionError {
            attempts,
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    /// Create a new notification error
    pub fn notification(message: impl Into<String>) -> Self {
        Self::NotificationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionError { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::PersistenceError { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }
}

/// Helper trait for converting serialization errors
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

//! Backend Module
//!
//! Server-side code: an Axum HTTP server exposing the hub over REST and a
//! Server-Sent Events live channel, with SQLite persistence and SMTP
//! notifications.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - configuration, application state, app creation
//! - **`routes`** - router assembly
//! - **`chat`** - SQLite store and REST handlers
//! - **`auth`** - shared-secret login
//! - **`realtime`** - SSE live channel
//! - **`email`** - SMTP notifier
//! - **`error`** - HTTP error type
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── chat/           - Store and handlers
//! ├── auth/           - Login
//! ├── realtime/       - SSE subscription
//! ├── email.rs        - SMTP notifier
//! └── error/          - Error types
//! ```
//!
//! # Error Handling
//!
//! Handlers return `Result<_, BackendError>`. Engine errors convert with
//! `?` and render as a JSON body with the matching status code.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Chat persistence and handlers
pub mod chat;

/// Real-time update system
pub mod realtime;

/// Backend error types
pub mod error;

/// Authentication
pub mod auth;

/// SMTP notifications
pub mod email;

pub use chat::SqlStore;
pub use email::{EmailNotifier, SmtpConfig};
pub use error::BackendError;
pub use server::{create_app, AppState, ServerConfig};

//! Pair Chat - Main Library
//!
//! Real-time synchronization engine for a private chat between exactly two
//! participants. Messages are persisted and broadcast, presence and typing
//! state flow over a live channel, read receipts converge across both
//! sides, and the admin participant is notified out-of-band while
//! unreachable.
//!
//! # Module Structure
//!
//! - **`shared`** - wire types shared by server and client
//!   - Messages, participants, events, API bodies
//!   - Chat configuration and error types
//!
//! - **`store`** - persistence port and the in-memory store
//!
//! - **`notify`** - out-of-band notification port
//!
//! - **`realtime`** - the hub
//!   - Topic event bus, presence tracker, notification gate
//!   - Live channels for connected participants
//!
//! - **`client`** - per-participant connection session
//!   - Reconnection policy, typing debounce, message reconciliation
//!   - In-process and HTTP transports
//!
//! - **`backend`** - Axum server (only compiled with `ssr` feature)
//!   - REST routes and the SSE live channel
//!   - SQLite store, SMTP notifier, environment configuration
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the backend module and the
//!   `pairchat-server` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pairchat::client::{ConnectionSession, LocalTransport};
//! use pairchat::notify::LogNotifier;
//! use pairchat::realtime::SyncHub;
//! use pairchat::shared::{ChatConfig, NewMessage, ParticipantId};
//! use pairchat::store::memory::MemoryStore;
//!
//! # async fn example() -> Result<(), pairchat::shared::SyncError> {
//! let hub = SyncHub::new(ChatConfig::default(), Arc::new(MemoryStore::new()), Arc::new(LogNotifier));
//! let session = ConnectionSession::new(
//!     ParticipantId::B,
//!     hub.config().clone(),
//!     Arc::new(LocalTransport::new(hub.clone())),
//! );
//! session.connect().await?;
//! session.send_message(NewMessage::text(ParticipantId::B, "hello")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The hub and sessions are cheap handles over shared state and can be
//! cloned or shared across tasks. Presence is owned by a single actor
//! task, so concurrent joins and leaves are applied in order.

/// Shared types and data structures
pub mod shared;

/// Persistence port
pub mod store;

/// Out-of-band notifications
pub mod notify;

/// Hub: event bus, presence, notification gate
pub mod realtime;

/// Client connection sessions
pub mod client;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;

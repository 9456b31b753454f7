//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the hub, the client sessions and the HTTP server. These types are used
//! for serialization over the live channel and the REST surface.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. All wire types serialize with the
//! camelCase field names the browser client expects.

/// Message data structure
pub mod message;

/// Participant identity and presence records
pub mod participant;

/// Real-time event system
pub mod event;

/// Shared error types
pub mod error;

/// Chat configuration
pub mod config;

/// HTTP request and response bodies
pub mod api;

/// Re-export commonly used types for convenience
pub use config::{ChatConfig, ChatConfigBuilder, ConfigError};
pub use error::SyncError;
pub use event::{PresenceEvent, ReadReceipt, SyncEvent, Topic, TypingEvent};
pub use message::{ContentKind, FileRef, Message, MessageId, NewMessage};
pub use participant::{Participant, ParticipantId, PresenceStatus};

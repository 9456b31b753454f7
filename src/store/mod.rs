//! Store Module
//!
//! The durable message and participant store is an external collaborator.
//! This module defines the request/response surface the engine consumes
//! from it. Every operation is atomic at the single-record level; nothing
//! here needs a multi-record transaction.
//!
//! # Implementations
//!
//! - [`memory::MemoryStore`] - in-process store used by tests and by
//!   servers started without a database
//! - `backend::chat::SqlStore` - SQLite store (requires the `ssr` feature)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::shared::{Message, MessageId, NewMessage, Participant, ParticipantId, SyncError};

/// In-memory store implementation
pub mod memory;

pub use memory::MemoryStore;

/// Operations the engine needs from the document store
///
/// Errors are reported as [`SyncError::PersistenceError`].
#[async_trait]
pub trait ChatStore: Send + Sync + 'static {
    /// All messages, ascending by timestamp
    async fn messages(&self) -> Result<Vec<Message>, SyncError>;

    /// Persist a draft, assigning its id and timestamp
    async fn insert_message(&self, draft: NewMessage) -> Result<Message, SyncError>;

    /// Set the read flag on every listed message
    ///
    /// Returns the confirmed records of the messages that exist.
    async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError>;

    /// Insert or replace a participant record
    async fn upsert_participant(&self, participant: Participant) -> Result<Participant, SyncError>;

    async fn find_participant(&self, id: ParticipantId) -> Result<Option<Participant>, SyncError>;

    /// Update the online flag, and last-seen when `last_seen` is given
    ///
    /// Returns `None` if the participant has never been upserted.
    async fn update_presence(
        &self,
        id: ParticipantId,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<Option<Participant>, SyncError>;
}

//! Client Transports
//!
//! A [`Transport`] is everything a [`ConnectionSession`](crate::client::ConnectionSession)
//! needs from the server: a live event channel plus the REST-style store
//! operations.
//!
//! # Implementations
//!
//! - [`LocalTransport`] - talks to an in-process [`SyncHub`](crate::realtime::SyncHub)
//! - [`HttpTransport`] - REST over reqwest, live channel over server-sent events

use async_trait::async_trait;

use crate::realtime::ChannelItem;
use crate::shared::{Message, MessageId, NewMessage, ParticipantId, PresenceStatus, SyncError, SyncEvent};

pub mod http;
pub mod local;

pub use http::HttpTransport;
pub use local::LocalTransport;

/// Receiving half of a live channel
#[async_trait]
pub trait EventStream: Send {
    /// Next item; `None` means the channel broke without a close frame
    async fn next(&mut self) -> Option<ChannelItem>;
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a live channel as `participant`; this is the join
    ///
    /// A client that is not `visible` joins without going online.
    async fn open(&self, participant: ParticipantId, visible: bool) -> Result<Box<dyn EventStream>, SyncError>;

    async fn fetch_history(&self) -> Result<Vec<Message>, SyncError>;

    /// Persist a draft and have it broadcast
    async fn send_message(&self, draft: NewMessage) -> Result<Message, SyncError>;

    /// Set the durable read flag; returns the confirmed records
    async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError>;

    /// Broadcast a typing or read-receipt event
    async fn publish(&self, event: SyncEvent) -> Result<(), SyncError>;

    async fn update_status(&self, participant: ParticipantId, status: PresenceStatus) -> Result<(), SyncError>;
}

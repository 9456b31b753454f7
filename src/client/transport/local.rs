//! In-process transport.

use async_trait::async_trait;

use crate::client::transport::{EventStream, Transport};
use crate::realtime::{ChannelItem, LiveChannel, SyncHub};
use crate::shared::{Message, MessageId, NewMessage, ParticipantId, PresenceStatus, SyncError, SyncEvent};

/// Transport bound directly to a hub in the same process
#[derive(Clone)]
pub struct LocalTransport {
    hub: SyncHub,
}

impl LocalTransport {
    pub fn new(hub: SyncHub) -> Self {
        Self { hub }
    }
}

struct LocalStream(LiveChannel);

#[async_trait]
impl EventStream for LocalStream {
    async fn next(&mut self) -> Option<ChannelItem> {
        self.0.recv().await
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn open(&self, participant: ParticipantId, visible: bool) -> Result<Box<dyn EventStream>, SyncError> {
        Ok(Box::new(LocalStream(self.hub.connect_as(participant, visible).await)))
    }

    async fn fetch_history(&self) -> Result<Vec<Message>, SyncError> {
        self.hub.history().await
    }

    async fn send_message(&self, draft: NewMessage) -> Result<Message, SyncError> {
        self.hub.send_message(draft).await
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError> {
        self.hub.mark_read(ids).await
    }

    async fn publish(&self, event: SyncEvent) -> Result<(), SyncError> {
        self.hub.publish(event).map(|_| ())
    }

    async fn update_status(&self, participant: ParticipantId, status: PresenceStatus) -> Result<(), SyncError> {
        self.hub.update_status(participant, status).await.map(|_| ())
    }
}

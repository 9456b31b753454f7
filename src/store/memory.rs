//! In-memory store.
//!
//! Keeps messages in insertion order, which is also timestamp order since
//! timestamps are assigned here at insert time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::shared::{Message, MessageId, NewMessage, Participant, ParticipantId, SyncError};
use crate::store::ChatStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: RwLock<Vec<Message>>,
    participants: RwLock<HashMap<ParticipantId, Participant>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a persistence error
    ///
    /// Lets callers exercise the failure paths of the engine.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), SyncError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::persistence("store unavailable"));
        }
        Ok(())
    }

    /// Number of stored messages
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn messages(&self) -> Result<Vec<Message>, SyncError> {
        self.check_available()?;
        Ok(self.messages.read().await.clone())
    }

    async fn insert_message(&self, draft: NewMessage) -> Result<Message, SyncError> {
        self.check_available()?;
        let mut messages = self.messages.write().await;
        // Keep timestamps non-decreasing even if the clock steps backwards.
        let now = Utc::now();
        let timestamp = messages
            .last()
            .map(|last| last.timestamp.max(now))
            .unwrap_or(now);
        let message = Message::from_draft(draft, MessageId::generate(), timestamp);
        messages.push(message.clone());
        Ok(message)
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError> {
        self.check_available()?;
        let wanted: HashSet<&MessageId> = ids.iter().collect();
        let mut messages = self.messages.write().await;
        let mut confirmed = Vec::new();
        for message in messages.iter_mut().filter(|m| wanted.contains(&m.id)) {
            message.read = true;
            confirmed.push(message.clone());
        }
        Ok(confirmed)
    }

    async fn upsert_participant(&self, participant: Participant) -> Result<Participant, SyncError> {
        self.check_available()?;
        self.participants
            .write()
            .await
            .insert(participant.id, participant.clone());
        Ok(participant)
    }

    async fn find_participant(&self, id: ParticipantId) -> Result<Option<Participant>, SyncError> {
        self.check_available()?;
        Ok(self.participants.read().await.get(&id).cloned())
    }

    async fn update_presence(
        &self,
        id: ParticipantId,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<Option<Participant>, SyncError> {
        self.check_available()?;
        let mut participants = self.participants.write().await;
        Ok(participants.get_mut(&id).map(|participant| {
            participant.online = online;
            if let Some(at) = last_seen {
                participant.last_seen = Some(at);
            }
            participant.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_id_and_orders() {
        let store = MemoryStore::new();
        let first = store
            .insert_message(NewMessage::text(ParticipantId::A, "one"))
            .await
            .unwrap();
        let second = store
            .insert_message(NewMessage::text(ParticipantId::B, "two"))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.timestamp <= second.timestamp);
        assert!(!first.read);

        let all = store.messages().await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn test_mark_read_returns_confirmed_records() {
        let store = MemoryStore::new();
        let message = store
            .insert_message(NewMessage::text(ParticipantId::B, "hi"))
            .await
            .unwrap();

        let confirmed = store
            .mark_read(&[message.id.clone(), MessageId::from("missing")])
            .await
            .unwrap();

        assert_eq!(confirmed.len(), 1);
        assert!(confirmed[0].read);
        assert!(store.messages().await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn test_update_presence_requires_upsert() {
        let store = MemoryStore::new();
        assert_eq!(store.update_presence(ParticipantId::A, true, None).await.unwrap(), None);

        store
            .upsert_participant(Participant::new(ParticipantId::A, "Alice", "a@example.com", true))
            .await
            .unwrap();
        let at = Utc::now();
        let updated = store
            .update_presence(ParticipantId::A, false, Some(at))
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.online);
        assert_eq!(updated.last_seen, Some(at));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.messages().await.unwrap_err();
        assert!(err.is_persistence());
    }
}

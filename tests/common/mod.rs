//! Common test utilities and helpers
//!
//! - A notifier that records what it was asked to send
//! - A scripted transport whose live channels the test drives by hand
//! - Hub and session builders

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use pairchat::client::{EventStream, SessionView, Transport};
use pairchat::notify::Notifier;
use pairchat::realtime::{ChannelItem, SyncHub};
use pairchat::shared::{
    ChatConfig, Message, MessageId, NewMessage, Participant, ParticipantId, PresenceStatus, SyncError, SyncEvent,
};
use pairchat::store::memory::MemoryStore;

pub const WAIT: Duration = Duration::from_secs(5);

/// Alice (`user1`) is the admin, Bob (`user2`) the other participant
pub fn config() -> ChatConfig {
    ChatConfig::builder()
        .admin(ParticipantId::A)
        .participant_name(ParticipantId::A, "Alice")
        .participant_name(ParticipantId::B, "Bob")
        .participant_contact(ParticipantId::A, "alice@example.com")
        .participant_contact(ParticipantId::B, "bob@example.com")
        .build()
        .unwrap()
}

pub fn hub(notifier: Arc<RecordingNotifier>) -> (SyncHub, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let hub = SyncHub::new(config(), store.clone(), notifier).with_shared_secret("hunter2");
    (hub, store)
}

/// Wait until the session view satisfies `predicate`
pub async fn wait_for_view(rx: &mut watch::Receiver<SessionView>, predicate: impl FnMut(&SessionView) -> bool) -> SessionView {
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session view")
        .expect("session dropped")
        .clone()
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never held");
}

#[derive(Default)]
pub struct RecordingNotifier {
    /// (message id, recipient email)
    pub sent: Mutex<Vec<(MessageId, String)>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &Message, _sender: &Participant, recipient: &Participant) -> Result<(), SyncError> {
        self.sent
            .lock()
            .unwrap()
            .push((message.id.clone(), recipient.email.clone()));
        Ok(())
    }
}

/// Transport with hand-driven live channels
///
/// Every successful `open` hands the test a sender for that channel:
/// pushing `ChannelItem::Closed` simulates a server close, dropping the
/// sender simulates a broken connection.
#[derive(Default)]
pub struct ScriptedTransport {
    pub opens: AtomicU32,
    /// Fail every open while set
    pub unreachable: AtomicBool,
    /// Fail this many opens before succeeding
    pub fail_next: AtomicU32,
    pub channels: Mutex<Vec<mpsc::UnboundedSender<ChannelItem>>>,
    pub published: Mutex<Vec<SyncEvent>>,
    pub statuses: Mutex<Vec<PresenceStatus>>,
    pub history: Mutex<Vec<Message>>,
}

impl ScriptedTransport {
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Sender of the most recently opened channel
    pub fn latest_channel(&self) -> mpsc::UnboundedSender<ChannelItem> {
        self.channels.lock().unwrap().last().cloned().expect("no channel opened")
    }

    /// Drop every channel sender, breaking the live channels
    pub fn break_channels(&self) {
        self.channels.lock().unwrap().clear();
    }

    pub fn typing_events(&self) -> Vec<bool> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                SyncEvent::Typing(typing) => Some(typing.is_typing),
                _ => None,
            })
            .collect()
    }
}

struct ScriptedStream(mpsc::UnboundedReceiver<ChannelItem>);

#[async_trait]
impl EventStream for ScriptedStream {
    async fn next(&mut self) -> Option<ChannelItem> {
        self.0.recv().await
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, _participant: ParticipantId, _visible: bool) -> Result<Box<dyn EventStream>, SyncError> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SyncError::connection(attempt, "unreachable"));
        }
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SyncError::connection(attempt, "refused"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.lock().unwrap().push(tx);
        Ok(Box::new(ScriptedStream(rx)))
    }

    async fn fetch_history(&self) -> Result<Vec<Message>, SyncError> {
        Ok(self.history.lock().unwrap().clone())
    }

    async fn send_message(&self, draft: NewMessage) -> Result<Message, SyncError> {
        Ok(Message::from_draft(draft, MessageId::generate(), chrono::Utc::now()))
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError> {
        let mut history = self.history.lock().unwrap();
        let mut confirmed = Vec::new();
        for message in history.iter_mut().filter(|m| ids.contains(&m.id)) {
            message.read = true;
            confirmed.push(message.clone());
        }
        Ok(confirmed)
    }

    async fn publish(&self, event: SyncEvent) -> Result<(), SyncError> {
        self.published.lock().unwrap().push(event);
        Ok(())
    }

    async fn update_status(&self, _participant: ParticipantId, status: PresenceStatus) -> Result<(), SyncError> {
        self.statuses.lock().unwrap().push(status);
        Ok(())
    }
}

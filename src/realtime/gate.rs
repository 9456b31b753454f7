//! Notification Gate
//!
//! Runs once per newly persisted message. When the message was sent by the
//! non-admin participant and the admin is not online on the live channel,
//! the admin is told out of band through the configured [`Notifier`].
//! A participant whose presence is still unknown counts as unreachable.

use std::sync::Arc;

use crate::notify::Notifier;
use crate::realtime::presence::PresenceTracker;
use crate::shared::{ChatConfig, Message, Participant, ParticipantId};
use crate::store::ChatStore;

/// Outcome of evaluating one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The admin sent it; nobody to notify
    SenderIsAdmin,
    /// The admin is online and will see it live
    RecipientOnline,
    /// The notifier accepted the notification
    Notified,
    /// The notifier failed; logged and dropped
    NotifyFailed,
}

pub struct NotificationGate {
    config: Arc<ChatConfig>,
    presence: PresenceTracker,
    store: Arc<dyn ChatStore>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationGate {
    pub fn new(
        config: Arc<ChatConfig>,
        presence: PresenceTracker,
        store: Arc<dyn ChatStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            presence,
            store,
            notifier,
        }
    }

    /// Decide for `message` and notify if needed
    pub async fn evaluate(&self, message: &Message) -> GateDecision {
        let admin = self.config.admin;
        if message.sender == admin {
            return GateDecision::SenderIsAdmin;
        }

        if self.presence.query(admin).await.state.is_online() {
            tracing::debug!("[Gate] {} is online, no notification for {}", admin, message.id);
            return GateDecision::RecipientOnline;
        }

        let sender = self.resolve(message.sender).await;
        let recipient = self.resolve(admin).await;

        match self.notifier.notify(message, &sender, &recipient).await {
            Ok(()) => {
                tracing::info!("[Gate] Notified {} about message {}", recipient.name, message.id);
                GateDecision::Notified
            }
            Err(e) => {
                tracing::warn!("[Gate] Notification for message {} failed: {}", message.id, e);
                GateDecision::NotifyFailed
            }
        }
    }

    /// Evaluate on a task of its own so callers never wait for the notifier
    pub fn dispatch(self: &Arc<Self>, message: Message) {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            gate.evaluate(&message).await;
        });
    }

    /// Stored participant record, or the configured one if the store has none
    async fn resolve(&self, id: ParticipantId) -> Participant {
        match self.store.find_participant(id).await {
            Ok(Some(participant)) => participant,
            Ok(None) => self.config.participant(id),
            Err(e) => {
                tracing::warn!("[Gate] Could not load {} from store: {}", id, e);
                self.config.participant(id)
            }
        }
    }
}

/**
 * Sync Hub
 *
 * Server-side composition of the real-time engine: the event bus, the
 * presence tracker, the store and the notification gate behind one
 * cloneable handle. HTTP handlers and the in-process transport both go
 * through it.
 *
 * # Sending
 *
 * A message is validated, persisted, handed to the notification gate and
 * then broadcast. Persistence completes before broadcast. A broadcast that
 * reaches nobody is still a successful send.
 *
 * # Live Channels
 *
 * [`SyncHub::connect`] opens a [`LiveChannel`] for one participant. The
 * channel first yields the peer's current presence (when known), then
 * every event on every topic. The bus subscriptions exist before the
 * presence snapshot is taken, so a peer transition racing the connect is
 * never lost. Dropping the channel is a disconnect.
 */
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::notify::Notifier;
use crate::realtime::bus::{EventBus, Subscription};
use crate::realtime::gate::NotificationGate;
use crate::realtime::presence::{ConnectionId, PresenceSnapshot, PresenceTracker};
use crate::shared::{
    ChatConfig, Message, MessageId, NewMessage, Participant, ParticipantId, PresenceStatus, SyncError, SyncEvent, Topic,
};
use crate::store::ChatStore;

/// Why a live channel ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The server closed the channel on purpose
    ServerInitiated,
    /// The channel broke
    TransportFailure,
}

/// Item delivered on a live channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelItem {
    Event(SyncEvent),
    Closed(CloseReason),
}

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no shared secret is configured")]
    NotConfigured,
    #[error("invalid password")]
    InvalidSecret,
    #[error(transparent)]
    Store(#[from] SyncError),
}

struct LiveConnection {
    participant: ParticipantId,
    tx: mpsc::UnboundedSender<ChannelItem>,
}

struct HubInner {
    config: Arc<ChatConfig>,
    bus: EventBus,
    presence: PresenceTracker,
    store: Arc<dyn ChatStore>,
    gate: Arc<NotificationGate>,
    shared_secret: Option<String>,
    connections: Mutex<HashMap<ConnectionId, LiveConnection>>,
    next_connection: AtomicU64,
}

/// Handle to the engine; cheap to clone
#[derive(Clone)]
pub struct SyncHub {
    inner: Arc<HubInner>,
}

impl SyncHub {
    /// Assemble the engine around a store and a notifier
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ChatConfig, store: Arc<dyn ChatStore>, notifier: Arc<dyn Notifier>) -> Self {
        let config = Arc::new(config);
        let bus = EventBus::new();
        let presence = PresenceTracker::spawn(bus.clone(), Some(Arc::clone(&store)));
        let gate = Arc::new(NotificationGate::new(
            Arc::clone(&config),
            presence.clone(),
            Arc::clone(&store),
            notifier,
        ));
        Self {
            inner: Arc::new(HubInner {
                config,
                bus,
                presence,
                store,
                gate,
                shared_secret: None,
                connections: Mutex::new(HashMap::new()),
                next_connection: AtomicU64::new(1),
            }),
        }
    }

    /// Require `secret` on [`SyncHub::authenticate`]
    ///
    /// Only valid while no other handle to the hub exists.
    pub fn with_shared_secret(mut self, secret: impl Into<String>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.shared_secret = Some(secret.into()),
            None => tracing::error!("[Hub] Shared secret must be set before the hub is shared"),
        }
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.inner.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.inner.presence
    }

    /// Persist, gate and broadcast a new message
    pub async fn send_message(&self, draft: NewMessage) -> Result<Message, SyncError> {
        draft.validate(self.inner.config.file_size_limit_bytes)?;

        let message = self.inner.store.insert_message(draft).await?;
        tracing::info!("[Hub] Message {} from {} persisted", message.id, message.sender);

        self.inner.gate.dispatch(message.clone());

        let delivered = self.inner.bus.publish(SyncEvent::Message(message.clone()));
        if delivered == 0 {
            tracing::debug!("[Hub] Message {} reached no live subscriber", message.id);
        }
        Ok(message)
    }

    /// Full history, ascending by timestamp
    pub async fn history(&self) -> Result<Vec<Message>, SyncError> {
        self.inner.store.messages().await
    }

    /// Set the durable read flag; returns the confirmed records
    pub async fn mark_read(&self, ids: &[MessageId]) -> Result<Vec<Message>, SyncError> {
        if ids.is_empty() {
            return Err(SyncError::validation("messageIds", "at least one message id is required"));
        }
        let confirmed = self.inner.store.mark_read(ids).await?;
        tracing::debug!("[Hub] Marked {} of {} messages read", confirmed.len(), ids.len());
        Ok(confirmed)
    }

    /// Broadcast a client event
    ///
    /// Only typing and read-receipt events may come from clients: messages
    /// go through [`SyncHub::send_message`] and presence is owned by the
    /// tracker.
    pub fn publish(&self, event: SyncEvent) -> Result<usize, SyncError> {
        match &event {
            SyncEvent::Typing(_) => {}
            SyncEvent::ReadReceipt(receipt) => receipt.validate()?,
            SyncEvent::Message(_) | SyncEvent::Presence(_) => {
                return Err(SyncError::validation(
                    "topic",
                    format!("'{}' events cannot be published by clients", event.topic()),
                ));
            }
        }
        Ok(self.inner.bus.publish(event))
    }

    /// Open a live channel for a visible `participant`
    pub async fn connect(&self, participant: ParticipantId) -> LiveChannel {
        self.connect_as(participant, true).await
    }

    /// Open a live channel; a hidden participant joins as offline
    ///
    /// Returns once the join is applied and the peer's presence is queued
    /// on the channel.
    pub async fn connect_as(&self, participant: ParticipantId, visible: bool) -> LiveChannel {
        let connection = self.inner.next_connection.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let subscriptions = Topic::ALL
            .iter()
            .map(|topic| {
                let tx = tx.clone();
                self.inner.bus.subscribe(*topic, move |event: SyncEvent| {
                    let sent = tx.send(ChannelItem::Event(event));
                    async move { sent.map_err(|_| SyncError::connection(0, "live channel closed")) }
                })
            })
            .collect();

        let (joined_tx, joined) = oneshot::channel();
        let snapshot_tx = tx.clone();
        self.connections().insert(connection, LiveConnection { participant, tx });
        self.inner.presence.join_with(participant, connection, visible, move |peer| {
            if let Some(status) = peer.state.status() {
                let _ = snapshot_tx.send(ChannelItem::Event(SyncEvent::presence(peer.participant, status)));
            }
            let _ = joined_tx.send(());
        });
        // Built before waiting so a cancelled connect still leaves.
        let channel = LiveChannel {
            participant,
            connection,
            rx,
            _subscriptions: subscriptions,
            hub: Arc::downgrade(&self.inner),
        };
        if joined.await.is_err() {
            tracing::warn!("[Hub] Presence tracker gone while {} joined", participant);
        }
        tracing::info!(
            "[Hub] {} connected (connection {}, visible: {})",
            participant,
            connection,
            visible
        );
        channel
    }

    /// Close every live channel of `participant`; returns how many were closed
    pub fn disconnect(&self, participant: ParticipantId) -> usize {
        let mut connections = self.connections();
        let ids: Vec<ConnectionId> = connections
            .iter()
            .filter(|(_, live)| live.participant == participant)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(live) = connections.remove(id) {
                let _ = live.tx.send(ChannelItem::Closed(CloseReason::ServerInitiated));
            }
        }
        ids.len()
    }

    /// Close every live channel, e.g. on shutdown
    pub fn disconnect_all(&self) -> usize {
        let drained: Vec<LiveConnection> = self.connections().drain().map(|(_, live)| live).collect();
        for live in &drained {
            let _ = live.tx.send(ChannelItem::Closed(CloseReason::ServerInitiated));
        }
        tracing::info!("[Hub] Closed {} live channels", drained.len());
        drained.len()
    }

    /// Explicit status change (window visibility, logout)
    pub async fn update_status(
        &self,
        participant: ParticipantId,
        status: PresenceStatus,
    ) -> Result<Option<Participant>, SyncError> {
        self.inner.presence.set_visible(participant, status.is_online());
        let last_seen = (!status.is_online()).then(Utc::now);
        self.inner
            .store
            .update_presence(participant, status.is_online(), last_seen)
            .await
    }

    /// Check the shared secret and upsert the participant as online
    pub async fn authenticate(&self, participant: ParticipantId, password: &str) -> Result<Participant, AuthError> {
        let Some(secret) = self.inner.shared_secret.as_deref() else {
            tracing::error!("[Hub] Authentication attempted without a configured secret");
            return Err(AuthError::NotConfigured);
        };
        if password != secret {
            tracing::warn!("[Hub] Rejected login for {}", participant);
            return Err(AuthError::InvalidSecret);
        }

        let mut record = self.inner.config.participant(participant);
        record.online = true;
        record.last_seen = Some(Utc::now());
        let stored = self.inner.store.upsert_participant(record).await?;
        tracing::info!("[Hub] {} authenticated", participant);
        Ok(stored)
    }

    /// Stored participant record with the live online flag
    pub async fn participant_status(&self, participant: ParticipantId) -> Result<Participant, SyncError> {
        let mut record = self
            .inner
            .store
            .find_participant(participant)
            .await?
            .unwrap_or_else(|| self.inner.config.participant(participant));
        let live: PresenceSnapshot = self.inner.presence.query(participant).await;
        if let Some(status) = live.state.status() {
            record.online = status.is_online();
            if live.last_seen_at.is_some() {
                record.last_seen = live.last_seen_at;
            }
        }
        Ok(record)
    }

    fn connections(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, LiveConnection>> {
        self.inner.connections.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One participant's live connection to the hub
///
/// Dropping it unsubscribes from the bus and reports the disconnect to the
/// presence tracker.
pub struct LiveChannel {
    participant: ParticipantId,
    connection: ConnectionId,
    rx: mpsc::UnboundedReceiver<ChannelItem>,
    _subscriptions: Vec<Subscription>,
    hub: Weak<HubInner>,
}

impl LiveChannel {
    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    /// Next item; `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<ChannelItem> {
        self.rx.recv().await
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.connections
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.connection);
            hub.presence.leave(self.participant, self.connection);
            tracing::info!("[Hub] {} disconnected (connection {})", self.participant, self.connection);
        }
    }
}

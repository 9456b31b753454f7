/**
 * Connection Session
 *
 * One session per participant per client. The session owns the live
 * channel, the typing debounce and the reconciled message view.
 *
 * # Lifecycle
 *
 * `connect` spawns a driver task that opens the channel (up to five
 * attempts, 2 s apart, each bounded by a 10 s timeout), loads history and
 * then applies live events until the channel ends. A server-initiated
 * close gets one immediate reconnect attempt before falling back to the
 * retry policy; a broken channel goes straight to the policy, which waits
 * before every attempt. When the policy is exhausted the session stays
 * `Failed` until `connect` is called again.
 *
 * `close` cancels the driver and the typing debounce, so nothing is
 * published afterwards, and reports the participant offline. A later
 * `connect` starts a fresh debounce.
 *
 * # Observing State
 *
 * Everything a UI needs is in [`SessionView`], published through a
 * `tokio::sync::watch` channel from [`ConnectionSession::subscribe`].
 */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::client::reconciler::MessageReconciler;
use crate::client::retry::{ReconnectPolicy, Schedule};
use crate::client::transport::{EventStream, Transport};
use crate::client::typing::{TypingDebouncer, TYPING_IDLE_TIMEOUT};
use crate::realtime::{ChannelItem, CloseReason};
use crate::shared::{ChatConfig, Message, MessageId, NewMessage, ParticipantId, PresenceStatus, SyncError, SyncEvent};

/// Live channel state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting {
        attempt: u32,
    },
    Connected,
    /// Attempt 0 is the gap before the first retry
    Reconnecting {
        attempt: u32,
    },
    /// Retry policy exhausted; waits for an explicit `connect`
    Failed,
    Closed,
}

/// Snapshot of everything the session knows
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub connection: ConnectionState,
    /// Peer presence as last announced; `None` until known
    pub peer_presence: Option<PresenceStatus>,
    pub peer_typing: bool,
    pub timeline: MessageReconciler,
    pub last_error: Option<SyncError>,
}

impl SessionView {
    pub fn messages(&self) -> &[Message] {
        self.timeline.messages()
    }
}

struct SessionInner {
    participant: ParticipantId,
    config: Arc<ChatConfig>,
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    view: watch::Sender<SessionView>,
    visible: AtomicBool,
}

pub struct ConnectionSession {
    inner: Arc<SessionInner>,
    driver: Mutex<Option<JoinHandle<()>>>,
    /// `None` after `close`
    typing: Mutex<Option<TypingDebouncer>>,
}

impl ConnectionSession {
    /// Create a session with the default reconnection policy
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(participant: ParticipantId, config: ChatConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_policy(participant, config, transport, ReconnectPolicy::default())
    }

    pub fn with_policy(
        participant: ParticipantId,
        config: ChatConfig,
        transport: Arc<dyn Transport>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        let inner = Arc::new(SessionInner {
            participant,
            config: Arc::new(config),
            transport,
            policy,
            view,
            visible: AtomicBool::new(true),
        });

        let typing = spawn_typing(participant, Arc::clone(&inner.transport));
        Self {
            inner,
            driver: Mutex::new(None),
            typing: Mutex::new(Some(typing)),
        }
    }

    pub fn participant(&self) -> ParticipantId {
        self.inner.participant
    }

    /// Watch the session state
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.view.subscribe()
    }

    /// Current session state
    pub fn view(&self) -> SessionView {
        self.inner.view.borrow().clone()
    }

    /// Establish the live channel and load history
    ///
    /// # Errors
    ///
    /// `ConnectionError` once the retry policy is exhausted.
    pub async fn connect(&self) -> Result<(), SyncError> {
        self.lock_typing()
            .get_or_insert_with(|| spawn_typing(self.inner.participant, Arc::clone(&self.inner.transport)));

        let (ready_tx, ready_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let driver = tokio::spawn(async move { inner.drive(ready_tx).await });

        if let Some(previous) = self.lock_driver().replace(driver) {
            previous.abort();
        }

        ready_rx
            .await
            .unwrap_or_else(|_| Err(SyncError::connection(0, "session closed while connecting")))
    }

    /// Send a message with a provisional pending entry
    ///
    /// # Errors
    ///
    /// `ValidationError` before anything is staged; otherwise the transport
    /// error, with the pending entry left `Failed` for [`retry_send`](Self::retry_send).
    pub async fn send_message(&self, draft: NewMessage) -> Result<Message, SyncError> {
        if draft.sender != self.inner.participant {
            return Err(SyncError::validation("sender", "drafts must be sent by the session participant"));
        }
        draft.validate(self.inner.config.file_size_limit_bytes)?;

        let local_id = Uuid::new_v4().simple().to_string();
        let staged = draft.clone();
        self.inner
            .view
            .send_modify(|view| view.timeline.stage(local_id.clone(), staged));
        self.inner.persist(&local_id, draft).await
    }

    /// Retry a failed send
    pub async fn retry_send(&self, local_id: &str) -> Result<Message, SyncError> {
        let mut draft = None;
        self.inner
            .view
            .send_modify(|view| draft = view.timeline.take_for_retry(local_id));
        let draft = draft.ok_or_else(|| SyncError::validation("localId", format!("no failed send '{}'", local_id)))?;
        self.inner.persist(local_id, draft).await
    }

    /// Mark messages read locally, tell the peer, then the store
    pub async fn emit_read(&self, ids: Vec<MessageId>) -> Result<(), SyncError> {
        self.inner.emit_read(ids).await
    }

    /// Typing indicator; debounced
    pub fn set_typing(&self, typing: bool) {
        match self.lock_typing().as_ref() {
            Some(debouncer) => debouncer.set_typing(typing),
            None => tracing::debug!("[Session] {} is closed, typing ignored", self.inner.participant),
        }
    }

    /// Window focus or visibility change
    pub async fn set_visibility(&self, visible: bool) {
        self.inner.visible.store(visible, Ordering::SeqCst);
        let status = if visible {
            PresenceStatus::Online
        } else {
            PresenceStatus::Offline
        };
        self.inner.report_status(status).await;

        if visible {
            self.inner.read_unread().await;
        }
    }

    /// Leave: cancel reconnection and typing, report offline
    pub async fn close(&self) {
        if let Some(driver) = self.lock_driver().take() {
            driver.abort();
        }
        if let Some(debouncer) = self.lock_typing().take() {
            debouncer.shutdown();
        }
        self.inner.view.send_modify(|view| {
            view.connection = ConnectionState::Closed;
            view.peer_typing = false;
        });
        self.inner.report_status(PresenceStatus::Offline).await;
        tracing::info!("[Session] {} closed", self.inner.participant);
    }

    fn lock_driver(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.driver.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_typing(&self) -> std::sync::MutexGuard<'_, Option<TypingDebouncer>> {
        self.typing.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn spawn_typing(participant: ParticipantId, transport: Arc<dyn Transport>) -> TypingDebouncer {
    TypingDebouncer::spawn(TYPING_IDLE_TIMEOUT, move |is_typing| {
        let transport = Arc::clone(&transport);
        async move {
            if let Err(e) = transport.publish(SyncEvent::typing(participant, is_typing)).await {
                tracing::warn!("[Session] Typing event for {} not published: {}", participant, e);
            }
        }
    })
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if let Some(driver) = self.lock_driver().take() {
            driver.abort();
        }
    }
}

impl SessionInner {
    fn peer(&self) -> ParticipantId {
        self.participant.peer()
    }

    fn set_connection(&self, state: ConnectionState) {
        self.view.send_modify(|view| view.connection = state);
    }

    /// Open the channel under the retry policy
    async fn establish(&self, schedule: Schedule, reconnecting: bool) -> Result<Box<dyn EventStream>, SyncError> {
        self.policy
            .run(schedule, |attempt| {
                self.set_connection(if reconnecting {
                    ConnectionState::Reconnecting { attempt }
                } else {
                    ConnectionState::Connecting { attempt }
                });
                self.transport.open(self.participant, self.visible.load(Ordering::SeqCst))
            })
            .await
    }

    /// One attempt right away, outside the retry policy
    async fn reconnect_now(&self) -> Result<Box<dyn EventStream>, SyncError> {
        let open = self.transport.open(self.participant, self.visible.load(Ordering::SeqCst));
        match tokio::time::timeout(self.policy.attempt_timeout, open).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::connection(1, "immediate reconnect timed out")),
        }
    }

    async fn drive(self: Arc<Self>, ready: oneshot::Sender<Result<(), SyncError>>) {
        let mut stream = match self.establish(Schedule::Immediate, false).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(&e);
                let _ = ready.send(Err(e));
                return;
            }
        };
        self.on_established().await;
        let _ = ready.send(Ok(()));

        loop {
            let reason = self.pump(stream.as_mut()).await;
            drop(stream);
            tracing::info!("[Session] Live channel of {} ended: {:?}", self.participant, reason);
            self.set_connection(ConnectionState::Reconnecting { attempt: 0 });

            let reopened = match reason {
                CloseReason::ServerInitiated => match self.reconnect_now().await {
                    Ok(stream) => Ok(stream),
                    Err(e) => {
                        tracing::warn!("[Session] Immediate reconnect failed: {}", e);
                        self.establish(Schedule::Delayed, true).await
                    }
                },
                CloseReason::TransportFailure => self.establish(Schedule::Delayed, true).await,
            };

            match reopened {
                Ok(next) => {
                    stream = next;
                    self.on_established().await;
                }
                Err(e) => {
                    self.fail(&e);
                    return;
                }
            }
        }
    }

    fn fail(&self, error: &SyncError) {
        tracing::error!("[Session] {} gave up connecting: {}", self.participant, error);
        self.view.send_modify(|view| {
            view.connection = ConnectionState::Failed;
            view.last_error = Some(error.clone());
        });
    }

    /// Channel is up: sync history and announce online
    async fn on_established(&self) {
        self.view.send_modify(|view| {
            view.connection = ConnectionState::Connected;
            view.last_error = None;
        });
        tracing::info!("[Session] {} connected", self.participant);

        match self.transport.fetch_history().await {
            Ok(history) => {
                let mut added = 0;
                self.view
                    .send_modify(|view| added = view.timeline.merge_history(history));
                tracing::debug!("[Session] History merged, {} new messages", added);
            }
            Err(e) => {
                tracing::warn!("[Session] History fetch failed: {}", e);
                self.view.send_modify(|view| view.last_error = Some(e));
            }
        }

        if self.visible.load(Ordering::SeqCst) {
            self.report_status(PresenceStatus::Online).await;
            self.read_unread().await;
        } else {
            // Already offline on the hub; this keeps the stored record in line.
            self.report_status(PresenceStatus::Offline).await;
        }
    }

    async fn pump(&self, stream: &mut dyn EventStream) -> CloseReason {
        loop {
            match stream.next().await {
                Some(ChannelItem::Event(event)) => self.apply(event).await,
                Some(ChannelItem::Closed(reason)) => return reason,
                None => return CloseReason::TransportFailure,
            }
        }
    }

    async fn apply(&self, event: SyncEvent) {
        let peer = self.peer();
        match event {
            SyncEvent::Message(message) => {
                let from_peer = message.sender == peer;
                let id = message.id.clone();
                let mut inserted = false;
                self.view
                    .send_modify(|view| inserted = view.timeline.apply_message(message));
                if inserted && from_peer && self.visible.load(Ordering::SeqCst) {
                    if let Err(e) = self.emit_read(vec![id]).await {
                        tracing::warn!("[Session] Auto read failed: {}", e);
                    }
                }
            }
            SyncEvent::Presence(presence) if presence.participant_id == peer => {
                self.view.send_modify(|view| {
                    view.peer_presence = Some(presence.status);
                    if !presence.status.is_online() {
                        view.peer_typing = false;
                    }
                });
            }
            SyncEvent::Typing(typing) if typing.participant_id == peer => {
                self.view.send_modify(|view| view.peer_typing = typing.is_typing);
            }
            SyncEvent::ReadReceipt(receipt) if receipt.participant_id == peer => {
                self.view
                    .send_modify(|view| {
                        view.timeline.apply_read_receipt(&receipt.message_ids);
                    });
            }
            // Own presence, typing and receipts echo back from the hub.
            _ => {}
        }
    }

    async fn persist(&self, local_id: &str, draft: NewMessage) -> Result<Message, SyncError> {
        match self.transport.send_message(draft).await {
            Ok(message) => {
                let canonical = message.clone();
                self.view
                    .send_modify(|view| {
                        view.timeline.resolve_pending(local_id, canonical);
                    });
                Ok(message)
            }
            Err(e) => {
                tracing::warn!("[Session] Send {} failed: {}", local_id, e);
                self.view.send_modify(|view| view.timeline.fail_pending(local_id));
                Err(e)
            }
        }
    }

    async fn emit_read(&self, ids: Vec<MessageId>) -> Result<(), SyncError> {
        if ids.is_empty() {
            return Err(SyncError::validation("messageIds", "at least one message id is required"));
        }

        self.view.send_modify(|view| {
            view.timeline.apply_read_receipt(&ids);
        });

        if let Err(e) = self
            .transport
            .publish(SyncEvent::read_receipt(self.participant, ids.clone()))
            .await
        {
            tracing::warn!("[Session] Read receipt not broadcast: {}", e);
        }

        let transport = Arc::clone(&self.transport);
        let view = self.view.clone();
        tokio::spawn(async move {
            match transport.mark_read(&ids).await {
                Ok(confirmed) => view.send_modify(|view| view.timeline.confirm(confirmed)),
                Err(e) => tracing::warn!("[Session] Read flags not persisted: {}", e),
            }
        });
        Ok(())
    }

    /// Mark everything the peer sent as read
    async fn read_unread(&self) {
        let unread = self.view.borrow().timeline.unread_from(self.peer());
        if unread.is_empty() {
            return;
        }
        if let Err(e) = self.emit_read(unread).await {
            tracing::warn!("[Session] Marking history read failed: {}", e);
        }
    }

    async fn report_status(&self, status: PresenceStatus) {
        if let Err(e) = self.transport.update_status(self.participant, status).await {
            tracing::warn!("[Session] Status {:?} for {} not stored: {}", status, self.participant, e);
        }
    }
}

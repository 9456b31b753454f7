/**
 * Presence Tracker
 *
 * Owns the process-wide presence table. A single actor task holds the
 * table; everyone else talks to it through [`PresenceTracker`], a cheap
 * cloneable handle that sends commands over a channel.
 *
 * # States
 *
 * Each participant starts `Unknown`. A participant is online while it has
 * at least one live connection and has not hidden itself; otherwise it is
 * offline. Only transitions are announced on the bus, so a second join
 * from the same participant publishes nothing.
 *
 * # Connections
 *
 * Joins and leaves carry a connection id. After a reconnect, the leave of
 * the old connection only removes that id and cannot flip the participant
 * offline while the new connection is live.
 *
 * A join also carries the client's visibility, so a hidden client that
 * reconnects stays offline instead of announcing online first. The join
 * callback receives the peer's presence inside the actor, before any later
 * transition is published.
 *
 * # Persistence
 *
 * Transitions are written to the store in order by a separate writer task.
 * Store failures are logged; they never affect the live table.
 */
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::realtime::bus::EventBus;
use crate::shared::{ParticipantId, PresenceStatus, SyncEvent};
use crate::store::ChatStore;

/// Identifies one live connection of a participant
pub type ConnectionId = u64;

/// Live presence state of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceState {
    /// Never seen since the process started
    #[default]
    Unknown,
    Online,
    Offline,
}

impl PresenceState {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    /// Wire status, if the state is known
    pub fn status(self) -> Option<PresenceStatus> {
        match self {
            Self::Unknown => None,
            Self::Online => Some(PresenceStatus::Online),
            Self::Offline => Some(PresenceStatus::Offline),
        }
    }
}

/// Point-in-time view of one participant's presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub participant: ParticipantId,
    pub state: PresenceState,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub connections: usize,
}

impl PresenceSnapshot {
    fn unknown(participant: ParticipantId) -> Self {
        Self {
            participant,
            state: PresenceState::Unknown,
            last_seen_at: None,
            connections: 0,
        }
    }
}

/// Runs in the actor with the peer's presence when a join is applied
pub type JoinCallback = Box<dyn FnOnce(PresenceSnapshot) + Send>;

enum PresenceCommand {
    Join {
        participant: ParticipantId,
        connection: ConnectionId,
        visible: bool,
        on_joined: Option<JoinCallback>,
    },
    Leave {
        participant: ParticipantId,
        connection: ConnectionId,
    },
    SetVisible {
        participant: ParticipantId,
        visible: bool,
    },
    Query {
        participant: ParticipantId,
        reply: oneshot::Sender<PresenceSnapshot>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<PresenceSnapshot>>,
    },
}

#[derive(Debug, Default)]
struct Entry {
    state: PresenceState,
    connections: HashSet<ConnectionId>,
    hidden: bool,
    last_seen_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn desired(&self) -> PresenceState {
        if !self.connections.is_empty() && !self.hidden {
            PresenceState::Online
        } else {
            PresenceState::Offline
        }
    }
}

struct PresenceWrite {
    participant: ParticipantId,
    online: bool,
    last_seen_at: Option<DateTime<Utc>>,
}

struct PresenceActor {
    table: HashMap<ParticipantId, Entry>,
    bus: EventBus,
    writes: Option<mpsc::UnboundedSender<PresenceWrite>>,
}

impl PresenceActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<PresenceCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                PresenceCommand::Join {
                    participant,
                    connection,
                    visible,
                    on_joined,
                } => {
                    if let Some(on_joined) = on_joined {
                        on_joined(self.snapshot_of(participant.peer()));
                    }
                    let entry = self.table.entry(participant).or_default();
                    entry.connections.insert(connection);
                    entry.hidden = !visible;
                    self.settle(participant);
                }
                PresenceCommand::Leave { participant, connection } => {
                    let entry = self.table.entry(participant).or_default();
                    if !entry.connections.remove(&connection) {
                        tracing::debug!(
                            "[Presence] Ignoring leave of unknown connection {} for {}",
                            connection,
                            participant
                        );
                    }
                    self.settle(participant);
                }
                PresenceCommand::SetVisible { participant, visible } => {
                    self.table.entry(participant).or_default().hidden = !visible;
                    self.settle(participant);
                }
                PresenceCommand::Query { participant, reply } => {
                    let _ = reply.send(self.snapshot_of(participant));
                }
                PresenceCommand::Snapshot { reply } => {
                    let all = ParticipantId::ALL.iter().map(|id| self.snapshot_of(*id)).collect();
                    let _ = reply.send(all);
                }
            }
        }
        tracing::debug!("[Presence] Tracker stopped");
    }

    fn snapshot_of(&self, participant: ParticipantId) -> PresenceSnapshot {
        match self.table.get(&participant) {
            Some(entry) => PresenceSnapshot {
                participant,
                state: entry.state,
                last_seen_at: entry.last_seen_at,
                connections: entry.connections.len(),
            },
            None => PresenceSnapshot::unknown(participant),
        }
    }

    /// Move the participant to its desired state, announcing a transition
    fn settle(&mut self, participant: ParticipantId) {
        let Some(entry) = self.table.get_mut(&participant) else {
            return;
        };
        let desired = entry.desired();
        if entry.state == desired {
            return;
        }
        // A stray leave is not a transition anyone has observed.
        if entry.state == PresenceState::Unknown && desired == PresenceState::Offline && !entry.hidden {
            return;
        }

        entry.state = desired;
        let last_seen_at = if desired == PresenceState::Offline {
            let now = Utc::now();
            entry.last_seen_at = Some(now);
            Some(now)
        } else {
            None
        };

        let Some(status) = desired.status() else {
            return;
        };
        tracing::info!("[Presence] {} is now {:?}", participant, status);
        self.bus.publish(SyncEvent::presence(participant, status));

        if let Some(writes) = &self.writes {
            let _ = writes.send(PresenceWrite {
                participant,
                online: desired.is_online(),
                last_seen_at,
            });
        }
    }
}

async fn write_presence(store: Arc<dyn ChatStore>, mut writes: mpsc::UnboundedReceiver<PresenceWrite>) {
    while let Some(write) = writes.recv().await {
        match store
            .update_presence(write.participant, write.online, write.last_seen_at)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!("[Presence] No stored record for {}, presence not persisted", write.participant);
            }
            Err(e) => {
                tracing::warn!("[Presence] Failed to persist presence of {}: {}", write.participant, e);
            }
        }
    }
}

/// Handle to the presence actor
#[derive(Clone)]
pub struct PresenceTracker {
    commands: mpsc::UnboundedSender<PresenceCommand>,
}

impl PresenceTracker {
    /// Start the actor; transitions are published on `bus` and, if a store
    /// is given, persisted to it
    pub fn spawn(bus: EventBus, store: Option<Arc<dyn ChatStore>>) -> Self {
        let writes = store.map(|store| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(write_presence(store, rx));
            tx
        });
        let (commands, rx) = mpsc::unbounded_channel();
        let actor = PresenceActor {
            table: HashMap::new(),
            bus,
            writes,
        };
        tokio::spawn(actor.run(rx));
        Self { commands }
    }

    fn send(&self, command: PresenceCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("[Presence] Tracker is gone, command dropped");
        }
    }

    /// Register a visible live connection
    pub fn join(&self, participant: ParticipantId, connection: ConnectionId) {
        self.send(PresenceCommand::Join {
            participant,
            connection,
            visible: true,
            on_joined: None,
        });
    }

    /// Register a live connection; `on_joined` gets the peer's presence
    /// before any transition published after the join
    pub fn join_with(
        &self,
        participant: ParticipantId,
        connection: ConnectionId,
        visible: bool,
        on_joined: impl FnOnce(PresenceSnapshot) + Send + 'static,
    ) {
        self.send(PresenceCommand::Join {
            participant,
            connection,
            visible,
            on_joined: Some(Box::new(on_joined)),
        });
    }

    /// Remove a live connection (clean or abrupt disconnect)
    pub fn leave(&self, participant: ParticipantId, connection: ConnectionId) {
        self.send(PresenceCommand::Leave { participant, connection });
    }

    /// Window visibility change; hidden participants are offline
    pub fn set_visible(&self, participant: ParticipantId, visible: bool) {
        self.send(PresenceCommand::SetVisible { participant, visible });
    }

    /// Current presence of one participant
    ///
    /// Answered after every command sent before it from this handle.
    pub async fn query(&self, participant: ParticipantId) -> PresenceSnapshot {
        let (reply, rx) = oneshot::channel();
        self.send(PresenceCommand::Query { participant, reply });
        rx.await.unwrap_or_else(|_| PresenceSnapshot::unknown(participant))
    }

    /// Current presence of both participants
    pub async fn snapshot(&self) -> Vec<PresenceSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(PresenceCommand::Snapshot { reply });
        rx.await.unwrap_or_else(|_| {
            ParticipantId::ALL
                .iter()
                .map(|id| PresenceSnapshot::unknown(*id))
                .collect()
        })
    }
}

//! Real-time Module
//!
//! Server side of the synchronization engine.
//!
//! # Components
//!
//! - [`bus`] - in-process publish/subscribe per topic
//! - [`presence`] - single-owner presence table, announces transitions
//! - [`gate`] - out-of-band notification decision per new message
//! - [`hub`] - composition used by HTTP handlers and in-process clients

pub mod bus;
pub mod gate;
pub mod hub;
pub mod presence;

pub use bus::{EventBus, EventHandler, Subscription};
pub use gate::{GateDecision, NotificationGate};
pub use hub::{AuthError, ChannelItem, CloseReason, LiveChannel, SyncHub};
pub use presence::{ConnectionId, PresenceSnapshot, PresenceState, PresenceTracker};

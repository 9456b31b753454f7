//! Client Module
//!
//! Client side of the synchronization engine: one [`ConnectionSession`]
//! per participant, talking to the server through a [`Transport`].
//!
//! - [`session`] - connection lifecycle, sends, read receipts, observable view
//! - [`reconciler`] - ordered, deduplicated message sequence
//! - [`typing`] - typing indicator debounce
//! - [`retry`] - reconnection policy
//! - [`transport`] - in-process and HTTP transports
//! - [`view`] - display projections

pub mod reconciler;
pub mod retry;
pub mod session;
pub mod transport;
pub mod typing;
pub mod view;

pub use reconciler::{MessageReconciler, PendingSend, SendStatus};
pub use retry::{ReconnectPolicy, Schedule};
pub use session::{ConnectionSession, ConnectionState, SessionView};
pub use transport::{EventStream, HttpTransport, LocalTransport, Transport};
pub use typing::{TypingDebouncer, TYPING_IDLE_TIMEOUT};
pub use view::{date_label, group_by_date, DateGroup};

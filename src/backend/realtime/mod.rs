//! Real-time Module
//!
//! Server-Sent Events transport for the hub's live channels.
//!
//! - **`subscription`** - `GET /api/realtime` handler

/// Server-Sent Events subscription handler
pub mod subscription;

pub use subscription::handle_realtime_subscription;

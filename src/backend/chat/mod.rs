//! Chat Module
//!
//! - **`db`** - SQLite implementation of the chat store
//! - **`handlers`** - REST handlers for messages, receipts, typing and status

/// SQLite persistence
pub mod db;

/// HTTP request handlers
pub mod handlers;

pub use db::SqlStore;

//! Authentication Module
//!
//! Shared-secret login for the two participants. There are no accounts,
//! tokens or sessions: the client keeps the returned participant record.

pub mod handlers;

pub use handlers::login;

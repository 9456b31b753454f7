//! Backend Error Module
//!
//! Error types returned by HTTP handlers, and their conversion into JSON
//! error responses.
//!
//! - **`types`** - `BackendError` and its status mapping
//! - **`conversion`** - `IntoResponse` implementation

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;

//! Route Configuration Module
//!
//! - **`router`** - main router creation and route assembly

/// Main router creation
pub mod router;

pub use router::create_router;

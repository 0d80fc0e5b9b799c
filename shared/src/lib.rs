//! Shared types for the fulfillment workspace
//!
//! Domain models (cart, menu item, order, payment, delivery), status
//! enums with explicit transition tables, and the unified error
//! taxonomy used across crates.

pub mod error;
pub mod models;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};

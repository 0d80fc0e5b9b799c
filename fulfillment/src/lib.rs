//! Order-fulfillment workflow core
//!
//! The ephemeral store-scoped cart plus the three linked append-only
//! state machines of a food-delivery backend:
//!
//! - [`cart::CartStore`] - one cart per customer in an expiring
//!   versioned cache; owns the single-supplier invariant
//! - [`orders::OrderWorkflow`] - turns validated line items into a
//!   persisted order with a server-computed total and advances its
//!   state machine
//! - [`payments::PaymentWorkflow`] - payment attempts against an order
//! - [`deliveries::DeliveryWorkflow`] - courier assignment through
//!   completion
//!
//! The workflows are separate units of work: each external trigger
//! (checkout, payment callback, courier app) calls the next step, and
//! a crash between steps leaves a recoverable intermediate state.

pub mod cart;
pub mod catalog;
pub mod deliveries;
pub mod directory;
pub mod orders;
pub mod payments;
pub mod storage;

// Re-exports
pub use cart::{CartError, CartStore};
pub use catalog::{InMemoryCatalog, PricingLookup};
pub use deliveries::{DeliveryError, DeliveryWorkflow};
pub use directory::{AddressDirectory, InMemoryDirectory, StoreDirectory};
pub use orders::{OrderError, OrderWorkflow, RequestedLine};
pub use payments::{PaymentError, PaymentWorkflow};
pub use storage::{Storage, StorageError, StorageResult};

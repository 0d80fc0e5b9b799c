//! Domain models
//!
//! Aggregates expose no public setters for status or totals; every
//! mutation goes through a validated transition method and the status
//! enums carry the full transition table.

pub mod cart;
pub mod delivery;
pub mod menu_item;
pub mod order;
pub mod payment;

// Re-exports
pub use cart::{Cart, CartLine};
pub use delivery::{Delivery, DeliveryStatus, InvalidDeliveryTransition};
pub use menu_item::{MenuItem, MenuItemStatus};
pub use order::{EmptyOrder, InvalidOrderTransition, Order, OrderLine, OrderStatus};
pub use payment::{InvalidPaymentTransition, Payment, PaymentStatus};

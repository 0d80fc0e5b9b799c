//! Order aggregate and state machine
//!
//! The order advances through an append-only state machine; the
//! transition table lives in [`OrderStatus::can_transition_to`] and is
//! the only place that decides legality. `total_amount` is computed
//! from the lines at creation and is never independently settable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Paid,
    Preparing,
    Delivering,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Transition table: current state x target state -> allowed
    ///
    /// Cancellation is only legal before preparation starts; COMPLETED
    /// and CANCELLED are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Paid)
                | (Paid, Preparing)
                | (Preparing, Delivering)
                | (Delivering, Completed)
                | (PendingPayment, Cancelled)
                | (Paid, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Illegal order state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal order transition: {from:?} -> {to:?}")]
pub struct InvalidOrderTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Attempt to create an order with no lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("order must contain at least one line")]
pub struct EmptyOrder;

/// One order line, captured from the pricing lookup at creation time
///
/// Immutable thereafter; later menu price changes never touch existing
/// orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub menu_item_id: Uuid,
    pub name: String,
    /// Unit price in minor currency units, resolved server-side
    pub unit_price: i64,
    pub quantity: i32,
}

impl OrderLine {
    /// Line total: unit price times quantity
    pub fn line_amount(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Order aggregate
///
/// Fields are private; reads go through accessors and writes through
/// the transition methods, so `total_amount == sum of line amounts`
/// holds in every reachable state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    id: Uuid,
    customer_id: Uuid,
    store_id: Uuid,
    status: OrderStatus,
    total_amount: i64,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    lines: Vec<OrderLine>,
}

impl Order {
    /// Create a new order in `PENDING_PAYMENT` with a freshly computed
    /// total
    pub fn create(customer_id: Uuid, store_id: Uuid, lines: Vec<OrderLine>) -> Result<Self, EmptyOrder> {
        if lines.is_empty() {
            return Err(EmptyOrder);
        }
        let total_amount = lines.iter().map(OrderLine::line_amount).sum();
        Ok(Self {
            id: Uuid::new_v4(),
            customer_id,
            store_id,
            status: OrderStatus::PendingPayment,
            total_amount,
            created_at: Utc::now(),
            paid_at: None,
            completed_at: None,
            lines,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn customer_id(&self) -> Uuid {
        self.customer_id
    }

    pub fn store_id(&self) -> Uuid {
        self.store_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Total in minor currency units; always the sum of line amounts
    pub fn total_amount(&self) -> i64 {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// `PENDING_PAYMENT -> PAID`, stamping `paid_at`
    pub fn mark_paid(&mut self) -> Result<(), InvalidOrderTransition> {
        self.transition(OrderStatus::Paid)?;
        self.paid_at = Some(Utc::now());
        Ok(())
    }

    /// `PAID -> PREPARING`
    pub fn start_preparing(&mut self) -> Result<(), InvalidOrderTransition> {
        self.transition(OrderStatus::Preparing)
    }

    /// `PREPARING -> DELIVERING`
    pub fn start_delivery(&mut self) -> Result<(), InvalidOrderTransition> {
        self.transition(OrderStatus::Delivering)
    }

    /// `DELIVERING -> COMPLETED`, stamping `completed_at`
    pub fn mark_delivered(&mut self) -> Result<(), InvalidOrderTransition> {
        self.transition(OrderStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Cancel the order; legal only while `PENDING_PAYMENT` or `PAID`
    pub fn cancel(&mut self) -> Result<(), InvalidOrderTransition> {
        self.transition(OrderStatus::Cancelled)
    }

    fn transition(&mut self, to: OrderStatus) -> Result<(), InvalidOrderTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidOrderTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

//! Delivery aggregate and state machine
//!
//! Tracks a courier dispatch from assignment through completion.
//! Timestamps are set once on the transition that reaches them and
//! never cleared; the transition table lives in
//! [`DeliveryStatus::can_transition_to`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Delivery status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    #[default]
    Assigned,
    PickedUp,
    Completed,
    Cancelled,
}

impl DeliveryStatus {
    /// Transition table: current state x target state -> allowed
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Assigned, PickedUp) | (PickedUp, Completed) | (Assigned, Cancelled) | (PickedUp, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Completed | DeliveryStatus::Cancelled)
    }
}

/// Illegal delivery state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal delivery transition: {from:?} -> {to:?}")]
pub struct InvalidDeliveryTransition {
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
}

/// One courier dispatch attempt for an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    id: Uuid,
    order_id: Uuid,
    rider_name: String,
    destination_address_id: Uuid,
    status: DeliveryStatus,
    assigned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    picked_up_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl Delivery {
    /// Create a delivery in `ASSIGNED`, stamping `assigned_at`
    pub fn assign(order_id: Uuid, rider_name: impl Into<String>, destination_address_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            rider_name: rider_name.into(),
            destination_address_id,
            status: DeliveryStatus::Assigned,
            assigned_at: Utc::now(),
            picked_up_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn rider_name(&self) -> &str {
        &self.rider_name
    }

    pub fn destination_address_id(&self) -> Uuid {
        self.destination_address_id
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }

    pub fn picked_up_at(&self) -> Option<DateTime<Utc>> {
        self.picked_up_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// `ASSIGNED -> PICKED_UP`, stamping `picked_up_at`
    pub fn pick_up(&mut self) -> Result<(), InvalidDeliveryTransition> {
        self.transition(DeliveryStatus::PickedUp)?;
        self.picked_up_at = Some(Utc::now());
        Ok(())
    }

    /// `PICKED_UP -> COMPLETED`, stamping `completed_at`
    pub fn complete(&mut self) -> Result<(), InvalidDeliveryTransition> {
        self.transition(DeliveryStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Cancel the dispatch; legal from `ASSIGNED` or `PICKED_UP`
    pub fn cancel(&mut self) -> Result<(), InvalidDeliveryTransition> {
        self.transition(DeliveryStatus::Cancelled)
    }

    fn transition(&mut self, to: DeliveryStatus) -> Result<(), InvalidDeliveryTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidDeliveryTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

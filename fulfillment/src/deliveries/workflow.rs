//! DeliveryWorkflow - courier assignment through completion
//!
//! Every transition guard lives inside the workflow (via the status
//! transition table), never with the caller. A redelivery is a new
//! dispatch record for the same order.

use super::DeliveryError;
use crate::directory::AddressDirectory;
use crate::storage::Storage;
use shared::models::{Delivery, InvalidDeliveryTransition};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Workflow advancing the delivery state machine
#[derive(Clone)]
pub struct DeliveryWorkflow {
    storage: Storage,
    addresses: Arc<dyn AddressDirectory>,
}

impl DeliveryWorkflow {
    pub fn new(storage: Storage, addresses: Arc<dyn AddressDirectory>) -> Self {
        Self { storage, addresses }
    }

    /// Create a dispatch in `ASSIGNED`, returning its id
    pub async fn assign(
        &self,
        order_id: Uuid,
        rider_name: &str,
        destination_address_id: Uuid,
    ) -> Result<Uuid, DeliveryError> {
        // 1. Validate the request
        if rider_name.trim().is_empty() {
            return Err(DeliveryError::BlankRiderName);
        }
        if self.storage.get_order(order_id)?.is_none() {
            return Err(DeliveryError::OrderNotFound(order_id));
        }
        if !self
            .addresses
            .address_exists(destination_address_id)
            .await
            .map_err(DeliveryError::Lookup)?
        {
            return Err(DeliveryError::AddressNotFound(destination_address_id));
        }

        // 2. Persist the dispatch and its per-order index row
        let delivery = Delivery::assign(order_id, rider_name, destination_address_id);
        self.storage.insert_delivery(&delivery)?;

        info!(delivery_id = %delivery.id(), %order_id, rider_name, "delivery assigned");
        Ok(delivery.id())
    }

    /// Load a delivery by id
    pub async fn get_by_id(&self, delivery_id: Uuid) -> Result<Delivery, DeliveryError> {
        self.storage
            .get_delivery(delivery_id)?
            .ok_or(DeliveryError::NotFound(delivery_id))
    }

    /// Most recent dispatch attempt for an order
    pub async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Delivery>, DeliveryError> {
        Ok(self.storage.latest_delivery_for_order(order_id)?)
    }

    /// `ASSIGNED -> PICKED_UP`
    pub async fn pick_up(&self, delivery_id: Uuid) -> Result<(), DeliveryError> {
        self.transition(delivery_id, Delivery::pick_up)?;
        info!(%delivery_id, "delivery picked up");
        Ok(())
    }

    /// `PICKED_UP -> COMPLETED`
    pub async fn complete(&self, delivery_id: Uuid) -> Result<(), DeliveryError> {
        self.transition(delivery_id, Delivery::complete)?;
        info!(%delivery_id, "delivery completed");
        Ok(())
    }

    /// Cancel the dispatch; legal from `ASSIGNED` or `PICKED_UP`
    pub async fn cancel(&self, delivery_id: Uuid) -> Result<(), DeliveryError> {
        self.transition(delivery_id, Delivery::cancel)?;
        info!(%delivery_id, "delivery cancelled");
        Ok(())
    }

    /// Load, transition, and store inside one write transaction
    fn transition<F>(&self, delivery_id: Uuid, f: F) -> Result<Delivery, DeliveryError>
    where
        F: FnOnce(&mut Delivery) -> Result<(), InvalidDeliveryTransition>,
    {
        let txn = self.storage.begin_write()?;
        let mut delivery = self
            .storage
            .get_delivery_txn(&txn, delivery_id)?
            .ok_or(DeliveryError::NotFound(delivery_id))?;
        f(&mut delivery)?;
        self.storage.put_delivery_txn(&txn, &delivery)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(delivery)
    }
}

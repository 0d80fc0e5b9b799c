//! Delivery workflow - courier dispatch from assignment to completion

mod workflow;

pub use workflow::DeliveryWorkflow;

use crate::storage::StorageError;
use shared::models::InvalidDeliveryTransition;
use shared::{AppError, ErrorCode};
use thiserror::Error;
use uuid::Uuid;

/// Delivery workflow errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery not found: {0}")]
    NotFound(Uuid),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("destination address not found: {0}")]
    AddressNotFound(Uuid),

    #[error("rider name must not be blank")]
    BlankRiderName,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidDeliveryTransition),

    #[error("lookup failed: {0}")]
    Lookup(AppError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        match &err {
            DeliveryError::NotFound(id) => {
                AppError::with_message(ErrorCode::DeliveryNotFound, err.to_string())
                    .with_detail("delivery_id", id.to_string())
            }
            DeliveryError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, err.to_string())
                    .with_detail("order_id", id.to_string())
            }
            DeliveryError::AddressNotFound(id) => {
                AppError::with_message(ErrorCode::AddressNotFound, err.to_string())
                    .with_detail("address_id", id.to_string())
            }
            DeliveryError::BlankRiderName => AppError::validation(err.to_string()),
            DeliveryError::InvalidTransition(_) => {
                AppError::with_message(ErrorCode::DeliveryInvalidTransition, err.to_string())
            }
            DeliveryError::Lookup(inner) => inner.clone(),
            DeliveryError::Storage(inner) => AppError::storage(inner.to_string()),
        }
    }
}

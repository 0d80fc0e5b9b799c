//! Order workflow - creation and state machine transitions

mod workflow;

pub use workflow::{OrderWorkflow, RequestedLine};

use crate::storage::StorageError;
use shared::models::InvalidOrderTransition;
use shared::{AppError, ErrorCode};
use thiserror::Error;
use uuid::Uuid;

/// Order workflow errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found: {0}")]
    NotFound(Uuid),

    #[error("store not found: {0}")]
    StoreNotFound(Uuid),

    #[error("menu item not found: {0}")]
    MenuItemNotFound(Uuid),

    #[error("menu item is unavailable: {0}")]
    MenuItemUnavailable(Uuid),

    #[error("menu item {menu_item_id} does not belong to store {store_id}")]
    MenuItemWrongStore { menu_item_id: Uuid, store_id: Uuid },

    #[error("order must contain at least one line")]
    EmptyLines,

    #[error("quantity must be between 1 and 9999, got {0}")]
    InvalidQuantity(i32),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidOrderTransition),

    #[error("lookup failed: {0}")]
    Lookup(AppError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match &err {
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, err.to_string())
                    .with_detail("order_id", id.to_string())
            }
            OrderError::StoreNotFound(id) => {
                AppError::with_message(ErrorCode::StoreNotFound, err.to_string())
                    .with_detail("store_id", id.to_string())
            }
            OrderError::MenuItemNotFound(id) => {
                AppError::with_message(ErrorCode::MenuItemNotFound, err.to_string())
                    .with_detail("menu_item_id", id.to_string())
            }
            OrderError::MenuItemUnavailable(id) => {
                AppError::with_message(ErrorCode::MenuItemUnavailable, err.to_string())
                    .with_detail("menu_item_id", id.to_string())
            }
            OrderError::MenuItemWrongStore { .. } | OrderError::InvalidQuantity(_) => {
                AppError::validation(err.to_string())
            }
            OrderError::EmptyLines => {
                AppError::with_message(ErrorCode::OrderEmpty, err.to_string())
            }
            OrderError::InvalidTransition(_) => {
                AppError::with_message(ErrorCode::OrderInvalidTransition, err.to_string())
            }
            OrderError::Lookup(inner) => inner.clone(),
            OrderError::Storage(inner) => AppError::storage(inner.to_string()),
        }
    }
}

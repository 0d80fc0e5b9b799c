//! Payment workflow - payment attempts against an order

mod workflow;

pub use workflow::PaymentWorkflow;

use crate::storage::StorageError;
use shared::models::InvalidPaymentTransition;
use shared::{AppError, ErrorCode};
use thiserror::Error;
use uuid::Uuid;

/// Payment workflow errors
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment not found: {0}")]
    NotFound(Uuid),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("payment amount must be positive and within bounds, got {0}")]
    InvalidAmount(i64),

    #[error("payment amount {got} does not match order total {expected}")]
    AmountMismatch { expected: i64, got: i64 },

    #[error("payment provider must not be blank")]
    BlankProvider,

    #[error("transaction id must not be blank")]
    BlankTransactionId,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidPaymentTransition),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match &err {
            PaymentError::NotFound(id) => {
                AppError::with_message(ErrorCode::PaymentNotFound, err.to_string())
                    .with_detail("payment_id", id.to_string())
            }
            PaymentError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, err.to_string())
                    .with_detail("order_id", id.to_string())
            }
            PaymentError::InvalidAmount(_) => {
                AppError::with_message(ErrorCode::PaymentInvalidAmount, err.to_string())
            }
            PaymentError::AmountMismatch { expected, got } => {
                AppError::with_message(ErrorCode::PaymentAmountMismatch, err.to_string())
                    .with_detail("expected", *expected)
                    .with_detail("got", *got)
            }
            PaymentError::BlankProvider | PaymentError::BlankTransactionId => {
                AppError::validation(err.to_string())
            }
            PaymentError::InvalidTransition(_) => {
                AppError::with_message(ErrorCode::PaymentInvalidTransition, err.to_string())
            }
            PaymentError::Storage(inner) => AppError::storage(inner.to_string()),
        }
    }
}

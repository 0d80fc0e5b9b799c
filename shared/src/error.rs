//! Unified error system for the fulfillment workspace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Delivery errors
//! - 7xxx: Cart and menu errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::ValidationFailed, "quantity must be at least 1");
//! assert_eq!(err.code, ErrorCode::ValidationFailed);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Unified error code enum
///
/// Codes are represented as u16 values for efficient serialization and
/// cross-language compatibility with the API layer above this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Illegal order state transition
    OrderInvalidTransition = 4002,
    /// Order has no lines
    OrderEmpty = 4003,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5001,
    /// Illegal payment state transition
    PaymentInvalidTransition = 5002,
    /// Payment amount is invalid
    PaymentInvalidAmount = 5003,
    /// Payment amount does not match the order total
    PaymentAmountMismatch = 5004,

    // ==================== 6xxx: Delivery ====================
    /// Delivery not found
    DeliveryNotFound = 6001,
    /// Illegal delivery state transition
    DeliveryInvalidTransition = 6002,
    /// Destination address not found
    AddressNotFound = 6003,

    // ==================== 7xxx: Cart and menu ====================
    /// Menu item not found
    MenuItemNotFound = 7001,
    /// Menu item is currently unavailable
    MenuItemUnavailable = 7002,
    /// Cart holds items from a different store
    CartDifferentStore = 7003,
    /// Store not found
    StoreNotFound = 7004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Storage error
    StorageError = 9002,
}

impl ErrorCode {
    /// Get the default message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::ValueOutOfRange => "Value out of range",
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderInvalidTransition => "Illegal order state transition",
            ErrorCode::OrderEmpty => "Order has no lines",
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::PaymentInvalidTransition => "Illegal payment state transition",
            ErrorCode::PaymentInvalidAmount => "Payment amount must be positive",
            ErrorCode::PaymentAmountMismatch => "Payment amount does not match order total",
            ErrorCode::DeliveryNotFound => "Delivery not found",
            ErrorCode::DeliveryInvalidTransition => "Illegal delivery state transition",
            ErrorCode::AddressNotFound => "Destination address not found",
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemUnavailable => "Menu item is unavailable",
            ErrorCode::CartDifferentStore => "Cart holds items from a different store",
            ErrorCode::StoreNotFound => "Store not found",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::StorageError => "Storage error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u16)
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            8 => Ok(ErrorCode::ValueOutOfRange),
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderInvalidTransition),
            4003 => Ok(ErrorCode::OrderEmpty),
            5001 => Ok(ErrorCode::PaymentNotFound),
            5002 => Ok(ErrorCode::PaymentInvalidTransition),
            5003 => Ok(ErrorCode::PaymentInvalidAmount),
            5004 => Ok(ErrorCode::PaymentAmountMismatch),
            6001 => Ok(ErrorCode::DeliveryNotFound),
            6002 => Ok(ErrorCode::DeliveryInvalidTransition),
            6003 => Ok(ErrorCode::AddressNotFound),
            7001 => Ok(ErrorCode::MenuItemNotFound),
            7002 => Ok(ErrorCode::MenuItemUnavailable),
            7003 => Ok(ErrorCode::CartDifferentStore),
            7004 => Ok(ErrorCode::StoreNotFound),
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),
            other => Err(InvalidErrorCode(other)),
        }
    }
}

/// Application error with structured error code and details
///
/// The primary error type handed to the API layer above this core:
/// a standardized [`ErrorCode`], a human-readable message, and optional
/// structured details (field-level context for debugging).
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::StorageError, msg)
    }
}

/// Result alias using [`AppError`]
pub type AppResult<T> = Result<T, AppError>;

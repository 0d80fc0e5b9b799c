//! Payment record and state machine
//!
//! SUCCESS and FAILED are terminal for a record; a payment retry is a
//! new record, never a re-open. `transaction_id` is set if and only if
//! the record is SUCCESS.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Success | PaymentStatus::Failed)
    }
}

/// Illegal payment state transition (the record is already terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal payment transition: {from:?} -> {to:?}")]
pub struct InvalidPaymentTransition {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

/// One payment attempt against an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    id: Uuid,
    order_id: Uuid,
    /// Amount in minor currency units
    amount: i64,
    status: PaymentStatus,
    provider: String,
    requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
}

impl Payment {
    /// Create a new PENDING payment attempt
    pub fn request(order_id: Uuid, amount: i64, provider: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount,
            status: PaymentStatus::Pending,
            provider: provider.into(),
            requested_at: Utc::now(),
            paid_at: None,
            transaction_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// `PENDING -> SUCCESS`, storing the gateway transaction id and
    /// stamping `paid_at`
    pub fn mark_success(&mut self, transaction_id: impl Into<String>) -> Result<(), InvalidPaymentTransition> {
        self.transition(PaymentStatus::Success)?;
        self.transaction_id = Some(transaction_id.into());
        self.paid_at = Some(Utc::now());
        Ok(())
    }

    /// `PENDING -> FAILED`; the transaction id stays empty
    pub fn mark_failed(&mut self) -> Result<(), InvalidPaymentTransition> {
        self.transition(PaymentStatus::Failed)?;
        self.transaction_id = None;
        Ok(())
    }

    fn transition(&mut self, to: PaymentStatus) -> Result<(), InvalidPaymentTransition> {
        if self.status.is_terminal() {
            return Err(InvalidPaymentTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_sets_transaction_id_and_paid_at() {
        let mut payment = Payment::request(Uuid::new_v4(), 4500, "CARD");
        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert_eq!(payment.transaction_id(), None);

        payment.mark_success("tx-123").unwrap();
        assert_eq!(payment.status(), PaymentStatus::Success);
        assert_eq!(payment.transaction_id(), Some("tx-123"));
        assert!(payment.paid_at().is_some());
    }

    #[test]
    fn failed_payment_has_no_transaction_id() {
        let mut payment = Payment::request(Uuid::new_v4(), 4500, "CARD");
        payment.mark_failed().unwrap();
        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert_eq!(payment.transaction_id(), None);
    }

    #[test]
    fn terminal_records_are_never_reopened() {
        let mut success = Payment::request(Uuid::new_v4(), 1000, "CARD");
        success.mark_success("tx-1").unwrap();
        assert!(success.mark_failed().is_err());
        assert!(success.mark_success("tx-2").is_err());
        // Transaction id is immutable once set
        assert_eq!(success.transaction_id(), Some("tx-1"));

        let mut failed = Payment::request(Uuid::new_v4(), 1000, "CARD");
        failed.mark_failed().unwrap();
        assert!(failed.mark_success("tx-3").is_err());
        assert_eq!(failed.transaction_id(), None);
    }
}

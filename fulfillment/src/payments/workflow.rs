//! PaymentWorkflow - records payment attempts and advances their state
//!
//! Each attempt is its own record; retries create a new record instead
//! of re-opening a terminal one, and the most recently requested
//! record is the authoritative payment status for an order.

use super::PaymentError;
use crate::storage::Storage;
use shared::models::Payment;
use tracing::info;
use uuid::Uuid;

/// Maximum payment amount in minor currency units
const MAX_AMOUNT: i64 = 100_000_000;

/// Workflow advancing the payment state machine
#[derive(Clone)]
pub struct PaymentWorkflow {
    storage: Storage,
}

impl PaymentWorkflow {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Record a new PENDING payment attempt, returning its id
    ///
    /// The amount must be positive, within bounds, and equal to the
    /// order's total; a mismatch is rejected rather than trusted.
    pub async fn request(
        &self,
        order_id: Uuid,
        amount: i64,
        provider: &str,
    ) -> Result<Uuid, PaymentError> {
        // 1. Validate the request
        if amount <= 0 || amount > MAX_AMOUNT {
            return Err(PaymentError::InvalidAmount(amount));
        }
        if provider.trim().is_empty() {
            return Err(PaymentError::BlankProvider);
        }

        // 2. The amount must match the order total
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or(PaymentError::OrderNotFound(order_id))?;
        if amount != order.total_amount() {
            return Err(PaymentError::AmountMismatch {
                expected: order.total_amount(),
                got: amount,
            });
        }

        // 3. Persist the attempt and its per-order index row
        let payment = Payment::request(order_id, amount, provider);
        self.storage.insert_payment(&payment)?;

        info!(payment_id = %payment.id(), %order_id, amount, provider, "payment requested");
        Ok(payment.id())
    }

    /// Load a payment by id
    pub async fn get_by_id(&self, payment_id: Uuid) -> Result<Payment, PaymentError> {
        self.storage
            .get_payment(payment_id)?
            .ok_or(PaymentError::NotFound(payment_id))
    }

    /// Authoritative (most recently requested) attempt for an order
    pub async fn latest_for_order(&self, order_id: Uuid) -> Result<Option<Payment>, PaymentError> {
        Ok(self.storage.latest_payment_for_order(order_id)?)
    }

    /// `PENDING -> SUCCESS`, storing the gateway transaction id
    pub async fn mark_success(
        &self,
        payment_id: Uuid,
        transaction_id: &str,
    ) -> Result<(), PaymentError> {
        if transaction_id.trim().is_empty() {
            return Err(PaymentError::BlankTransactionId);
        }

        let txn = self.storage.begin_write()?;
        let mut payment = self
            .storage
            .get_payment_txn(&txn, payment_id)?
            .ok_or(PaymentError::NotFound(payment_id))?;
        payment.mark_success(transaction_id)?;
        self.storage.put_payment_txn(&txn, &payment)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        info!(%payment_id, transaction_id, "payment succeeded");
        Ok(())
    }

    /// `PENDING -> FAILED`
    pub async fn mark_failed(&self, payment_id: Uuid) -> Result<(), PaymentError> {
        let txn = self.storage.begin_write()?;
        let mut payment = self
            .storage
            .get_payment_txn(&txn, payment_id)?
            .ok_or(PaymentError::NotFound(payment_id))?;
        payment.mark_failed()?;
        self.storage.put_payment_txn(&txn, &payment)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        info!(%payment_id, "payment failed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Order, OrderLine, PaymentStatus};

    struct Fixture {
        workflow: PaymentWorkflow,
        storage: Storage,
    }

    fn fixture() -> Fixture {
        let storage = Storage::open_in_memory().unwrap();
        Fixture {
            workflow: PaymentWorkflow::new(storage.clone()),
            storage,
        }
    }

    /// Persist an order with the given total and return its id
    fn seed_order(storage: &Storage, total: i64) -> Uuid {
        let order = Order::create(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![OrderLine {
                menu_item_id: Uuid::new_v4(),
                name: "Fried chicken".to_string(),
                unit_price: total,
                quantity: 1,
            }],
        )
        .unwrap();
        storage.insert_order(&order).unwrap();
        order.id()
    }

    #[tokio::test]
    async fn request_creates_a_pending_record() {
        let f = fixture();
        let order_id = seed_order(&f.storage, 4500);

        let payment_id = f.workflow.request(order_id, 4500, "CARD").await.unwrap();

        let payment = f.workflow.get_by_id(payment_id).await.unwrap();
        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert_eq!(payment.amount(), 4500);
        assert_eq!(payment.provider(), "CARD");
        assert_eq!(payment.transaction_id(), None);
    }

    #[tokio::test]
    async fn request_rejects_bad_input() {
        let f = fixture();
        let order_id = seed_order(&f.storage, 4500);

        assert!(matches!(
            f.workflow.request(order_id, 0, "CARD").await.unwrap_err(),
            PaymentError::InvalidAmount(0)
        ));
        assert!(matches!(
            f.workflow.request(order_id, -100, "CARD").await.unwrap_err(),
            PaymentError::InvalidAmount(-100)
        ));
        assert!(matches!(
            f.workflow.request(order_id, 4500, "  ").await.unwrap_err(),
            PaymentError::BlankProvider
        ));
        assert!(matches!(
            f.workflow.request(Uuid::new_v4(), 4500, "CARD").await.unwrap_err(),
            PaymentError::OrderNotFound(_)
        ));
    }

    #[tokio::test]
    async fn mismatched_amount_is_rejected() {
        let f = fixture();
        let order_id = seed_order(&f.storage, 4500);

        assert!(matches!(
            f.workflow.request(order_id, 4000, "CARD").await.unwrap_err(),
            PaymentError::AmountMismatch {
                expected: 4500,
                got: 4000
            }
        ));
    }

    #[tokio::test]
    async fn success_stores_the_transaction_id() {
        let f = fixture();
        let order_id = seed_order(&f.storage, 4500);
        let payment_id = f.workflow.request(order_id, 4500, "CARD").await.unwrap();

        f.workflow.mark_success(payment_id, "tx-42").await.unwrap();

        let payment = f.workflow.get_by_id(payment_id).await.unwrap();
        assert_eq!(payment.status(), PaymentStatus::Success);
        assert_eq!(payment.transaction_id(), Some("tx-42"));
        assert!(payment.paid_at().is_some());
    }

    #[tokio::test]
    async fn blank_transaction_id_is_rejected() {
        let f = fixture();
        let order_id = seed_order(&f.storage, 4500);
        let payment_id = f.workflow.request(order_id, 4500, "CARD").await.unwrap();

        assert!(matches!(
            f.workflow.mark_success(payment_id, "").await.unwrap_err(),
            PaymentError::BlankTransactionId
        ));
        // Record is untouched
        let payment = f.workflow.get_by_id(payment_id).await.unwrap();
        assert_eq!(payment.status(), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn terminal_records_reject_further_transitions() {
        let f = fixture();
        let order_id = seed_order(&f.storage, 4500);
        let payment_id = f.workflow.request(order_id, 4500, "CARD").await.unwrap();
        f.workflow.mark_failed(payment_id).await.unwrap();

        assert!(matches!(
            f.workflow.mark_success(payment_id, "tx-1").await.unwrap_err(),
            PaymentError::InvalidTransition(_)
        ));

        let payment = f.workflow.get_by_id(payment_id).await.unwrap();
        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert_eq!(payment.transaction_id(), None);
    }

    #[tokio::test]
    async fn retry_is_a_new_record_and_becomes_authoritative() {
        let f = fixture();
        let order_id = seed_order(&f.storage, 4500);

        let first = f.workflow.request(order_id, 4500, "CARD").await.unwrap();
        f.workflow.mark_failed(first).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = f.workflow.request(order_id, 4500, "ACCOUNT_TRANSFER").await.unwrap();
        assert_ne!(first, second);

        let latest = f.workflow.latest_for_order(order_id).await.unwrap().unwrap();
        assert_eq!(latest.id(), second);
        assert_eq!(latest.status(), PaymentStatus::Pending);

        // The failed first attempt is still readable
        let old = f.workflow.get_by_id(first).await.unwrap();
        assert_eq!(old.status(), PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let f = fixture();
        let ghost = Uuid::new_v4();
        assert!(matches!(
            f.workflow.get_by_id(ghost).await.unwrap_err(),
            PaymentError::NotFound(id) if id == ghost
        ));
        assert!(matches!(
            f.workflow.mark_failed(ghost).await.unwrap_err(),
            PaymentError::NotFound(_)
        ));
        assert!(f.workflow.latest_for_order(ghost).await.unwrap().is_none());
    }
}

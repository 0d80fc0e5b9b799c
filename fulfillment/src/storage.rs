//! redb-based storage for the order, payment, and delivery aggregates
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order aggregate (header + lines) |
//! | `customer_orders` | `(customer_id, order_id)` | `()` | Customer order index |
//! | `payments` | `payment_id` | `Payment` | Payment attempts |
//! | `order_payments` | `(order_id, requested_at_ms, payment_id)` | `()` | Per-order attempt index, time-ordered |
//! | `deliveries` | `delivery_id` | `Delivery` | Delivery dispatches |
//! | `order_deliveries` | `(order_id, assigned_at_ms, delivery_id)` | `()` | Per-order dispatch index, time-ordered |
//!
//! An order and its index row are written in one write transaction, so
//! the aggregate (header plus all lines) is either fully persisted or
//! not at all. Values are JSON-serialized; keys are UUID strings.
//!
//! State transitions use the `*_txn` variants inside a single write
//! transaction (load, transition, store, commit), so two concurrent
//! transitions on the same row serialize instead of losing an update.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::{Delivery, Order, Payment};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Order aggregates: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Customer order index: key = (customer_id, order_id), value = empty
const CUSTOMER_ORDERS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("customer_orders");

/// Payment attempts: key = payment_id, value = JSON-serialized Payment
const PAYMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");

/// Per-order payment index, ordered by request time
const ORDER_PAYMENTS_TABLE: TableDefinition<(&str, u64, &str), ()> =
    TableDefinition::new("order_payments");

/// Delivery dispatches: key = delivery_id, value = JSON-serialized Delivery
const DELIVERIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("deliveries");

/// Per-order delivery index, ordered by assignment time
const ORDER_DELIVERIES_TABLE: TableDefinition<(&str, u64, &str), ()> =
    TableDefinition::new("order_deliveries");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for shared::AppError {
    fn from(err: StorageError) -> Self {
        shared::AppError::storage(err.to_string())
    }
}

fn millis(ts: chrono::DateTime<chrono::Utc>) -> u64 {
    ts.timestamp_millis().max(0) as u64
}

/// Durable store for the three workflow aggregates, backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits with copy-on-write and an atomic pointer swap, so
    /// the file stays consistent across crashes and power loss.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables up front so reads never hit a missing table
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(CUSTOMER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(ORDER_PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(DELIVERIES_TABLE)?;
            let _ = write_txn.open_table(ORDER_DELIVERIES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Operations ==========

    /// Persist a new order as one atomic unit
    ///
    /// Writes the aggregate (header plus all lines) and its customer
    /// index row in a single transaction.
    pub fn insert_order(&self, order: &Order) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let value = serde_json::to_vec(order)?;
            orders.insert(order.id().to_string().as_str(), value.as_slice())?;

            let mut index = txn.open_table(CUSTOMER_ORDERS_TABLE)?;
            index.insert(
                (
                    order.customer_id().to_string().as_str(),
                    order.id().to_string().as_str(),
                ),
                (),
            )?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Load an order by id
    pub fn get_order(&self, order_id: Uuid) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Load an order within a write transaction
    pub fn get_order_txn(&self, txn: &WriteTransaction, order_id: Uuid) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store an updated order within a write transaction
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id().to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    /// List all orders of a customer (read-only, for the reporting
    /// layer)
    pub fn orders_for_customer(&self, customer_id: Uuid) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CUSTOMER_ORDERS_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let customer_key = customer_id.to_string();
        let mut result = Vec::new();
        for entry in index.range((customer_key.as_str(), "")..)? {
            let (key, _) = entry?;
            let (cid, order_id) = key.value();
            if cid != customer_key {
                break;
            }
            if let Some(value) = orders.get(order_id)? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(result)
    }

    // ========== Payment Operations ==========

    /// Persist a new payment attempt and its per-order index row
    pub fn insert_payment(&self, payment: &Payment) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut payments = txn.open_table(PAYMENTS_TABLE)?;
            let value = serde_json::to_vec(payment)?;
            payments.insert(payment.id().to_string().as_str(), value.as_slice())?;

            let mut index = txn.open_table(ORDER_PAYMENTS_TABLE)?;
            index.insert(
                (
                    payment.order_id().to_string().as_str(),
                    millis(payment.requested_at()),
                    payment.id().to_string().as_str(),
                ),
                (),
            )?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Load a payment by id
    pub fn get_payment(&self, payment_id: Uuid) -> StorageResult<Option<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS_TABLE)?;
        match table.get(payment_id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Load a payment within a write transaction
    pub fn get_payment_txn(&self, txn: &WriteTransaction, payment_id: Uuid) -> StorageResult<Option<Payment>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        match table.get(payment_id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store an updated payment within a write transaction
    ///
    /// `requested_at` is immutable, so the index row never moves.
    pub fn put_payment_txn(&self, txn: &WriteTransaction, payment: &Payment) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENTS_TABLE)?;
        let value = serde_json::to_vec(payment)?;
        table.insert(payment.id().to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    /// Most recently requested payment attempt for an order
    ///
    /// The index key is `(order_id, requested_at_ms, payment_id)`, so
    /// the last entry in the prefix range is the authoritative attempt.
    pub fn latest_payment_for_order(&self, order_id: Uuid) -> StorageResult<Option<Payment>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDER_PAYMENTS_TABLE)?;
        let payments = read_txn.open_table(PAYMENTS_TABLE)?;

        let order_key = order_id.to_string();
        let mut latest: Option<String> = None;
        for entry in index.range((order_key.as_str(), 0u64, "")..)? {
            let (key, _) = entry?;
            let (oid, _requested_at, payment_id) = key.value();
            if oid != order_key {
                break;
            }
            latest = Some(payment_id.to_string());
        }

        match latest {
            Some(payment_id) => match payments.get(payment_id.as_str())? {
                Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    // ========== Delivery Operations ==========

    /// Persist a new delivery dispatch and its per-order index row
    pub fn insert_delivery(&self, delivery: &Delivery) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut deliveries = txn.open_table(DELIVERIES_TABLE)?;
            let value = serde_json::to_vec(delivery)?;
            deliveries.insert(delivery.id().to_string().as_str(), value.as_slice())?;

            let mut index = txn.open_table(ORDER_DELIVERIES_TABLE)?;
            index.insert(
                (
                    delivery.order_id().to_string().as_str(),
                    millis(delivery.assigned_at()),
                    delivery.id().to_string().as_str(),
                ),
                (),
            )?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Load a delivery by id
    pub fn get_delivery(&self, delivery_id: Uuid) -> StorageResult<Option<Delivery>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DELIVERIES_TABLE)?;
        match table.get(delivery_id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Load a delivery within a write transaction
    pub fn get_delivery_txn(&self, txn: &WriteTransaction, delivery_id: Uuid) -> StorageResult<Option<Delivery>> {
        let table = txn.open_table(DELIVERIES_TABLE)?;
        match table.get(delivery_id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store an updated delivery within a write transaction
    pub fn put_delivery_txn(&self, txn: &WriteTransaction, delivery: &Delivery) -> StorageResult<()> {
        let mut table = txn.open_table(DELIVERIES_TABLE)?;
        let value = serde_json::to_vec(delivery)?;
        table.insert(delivery.id().to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    /// Most recent dispatch attempt for an order
    pub fn latest_delivery_for_order(&self, order_id: Uuid) -> StorageResult<Option<Delivery>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDER_DELIVERIES_TABLE)?;
        let deliveries = read_txn.open_table(DELIVERIES_TABLE)?;

        let order_key = order_id.to_string();
        let mut latest: Option<String> = None;
        for entry in index.range((order_key.as_str(), 0u64, "")..)? {
            let (key, _) = entry?;
            let (oid, _assigned_at, delivery_id) = key.value();
            if oid != order_key {
                break;
            }
            latest = Some(delivery_id.to_string());
        }

        match latest {
            Some(delivery_id) => match deliveries.get(delivery_id.as_str())? {
                Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderLine;

    fn test_order(customer_id: Uuid) -> Order {
        Order::create(
            customer_id,
            Uuid::new_v4(),
            vec![OrderLine {
                menu_item_id: Uuid::new_v4(),
                name: "Bibimbap".to_string(),
                unit_price: 9000,
                quantity: 1,
            }],
        )
        .unwrap()
    }

    #[test]
    fn order_round_trips_with_lines() {
        let storage = Storage::open_in_memory().unwrap();
        let order = test_order(Uuid::new_v4());
        storage.insert_order(&order).unwrap();

        let loaded = storage.get_order(order.id()).unwrap().unwrap();
        assert_eq!(loaded, order);
        assert_eq!(loaded.lines().len(), 1);
    }

    #[test]
    fn missing_order_is_none() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.get_order(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn customer_index_only_returns_own_orders() {
        let storage = Storage::open_in_memory().unwrap();
        let customer = Uuid::new_v4();
        let mine_a = test_order(customer);
        let mine_b = test_order(customer);
        let other = test_order(Uuid::new_v4());
        storage.insert_order(&mine_a).unwrap();
        storage.insert_order(&mine_b).unwrap();
        storage.insert_order(&other).unwrap();

        let listed = storage.orders_for_customer(customer).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|o| o.customer_id() == customer));
    }

    #[test]
    fn transactional_update_replaces_the_row() {
        let storage = Storage::open_in_memory().unwrap();
        let order = test_order(Uuid::new_v4());
        storage.insert_order(&order).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut loaded = storage.get_order_txn(&txn, order.id()).unwrap().unwrap();
        loaded.mark_paid().unwrap();
        storage.put_order_txn(&txn, &loaded).unwrap();
        txn.commit().unwrap();

        let reloaded = storage.get_order(order.id()).unwrap().unwrap();
        assert!(reloaded.paid_at().is_some());
    }

    #[test]
    fn latest_payment_follows_request_order() {
        let storage = Storage::open_in_memory().unwrap();
        let order_id = Uuid::new_v4();

        let first = Payment::request(order_id, 4500, "CARD");
        storage.insert_payment(&first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let retry = Payment::request(order_id, 4500, "CARD");
        storage.insert_payment(&retry).unwrap();

        let latest = storage.latest_payment_for_order(order_id).unwrap().unwrap();
        assert_eq!(latest.id(), retry.id());

        // Other orders are untouched by the prefix scan
        assert!(storage.latest_payment_for_order(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fulfillment.redb");

        let order = test_order(Uuid::new_v4());
        {
            let storage = Storage::open(&path).unwrap();
            storage.insert_order(&order).unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        let loaded = storage.get_order(order.id()).unwrap().unwrap();
        assert_eq!(loaded.total_amount(), order.total_amount());
    }
}

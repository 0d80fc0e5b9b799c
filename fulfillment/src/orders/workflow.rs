//! OrderWorkflow - order creation and state transitions
//!
//! `create` resolves every requested line through the pricing lookup
//! and persists the aggregate in one transaction; the client supplies
//! only menu item ids and quantities, never prices or names. The
//! transition methods load, transition, and store inside a single
//! write transaction.

use super::OrderError;
use crate::catalog::PricingLookup;
use crate::directory::StoreDirectory;
use crate::storage::Storage;
use shared::models::{InvalidOrderTransition, Order, OrderLine};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Maximum quantity for a single order line
const MAX_QUANTITY: i32 = 9999;

/// One requested line at checkout: the client names the item and how
/// many, nothing else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub menu_item_id: Uuid,
    pub quantity: i32,
}

/// Workflow advancing the order state machine
#[derive(Clone)]
pub struct OrderWorkflow {
    storage: Storage,
    pricing: Arc<dyn PricingLookup>,
    stores: Arc<dyn StoreDirectory>,
}

impl OrderWorkflow {
    pub fn new(storage: Storage, pricing: Arc<dyn PricingLookup>, stores: Arc<dyn StoreDirectory>) -> Self {
        Self {
            storage,
            pricing,
            stores,
        }
    }

    /// Create an order from validated requested lines
    ///
    /// Returns the new order id; the order starts in
    /// `PENDING_PAYMENT`.
    pub async fn create(
        &self,
        customer_id: Uuid,
        store_id: Uuid,
        requested: &[RequestedLine],
    ) -> Result<Uuid, OrderError> {
        // 1. Validate request shape
        if requested.is_empty() {
            return Err(OrderError::EmptyLines);
        }
        for line in requested {
            if line.quantity < 1 || line.quantity > MAX_QUANTITY {
                return Err(OrderError::InvalidQuantity(line.quantity));
            }
        }

        // 2. The store must exist
        if !self
            .stores
            .store_exists(store_id)
            .await
            .map_err(OrderError::Lookup)?
        {
            return Err(OrderError::StoreNotFound(store_id));
        }

        // 3. Resolve authoritative name and price per line
        let mut lines = Vec::with_capacity(requested.len());
        for req in requested {
            let item = self
                .pricing
                .find_menu_item(req.menu_item_id)
                .await
                .map_err(OrderError::Lookup)?
                .ok_or(OrderError::MenuItemNotFound(req.menu_item_id))?;

            if item.store_id != store_id {
                return Err(OrderError::MenuItemWrongStore {
                    menu_item_id: req.menu_item_id,
                    store_id,
                });
            }
            if !item.is_available() {
                return Err(OrderError::MenuItemUnavailable(req.menu_item_id));
            }

            lines.push(OrderLine {
                menu_item_id: req.menu_item_id,
                name: item.name,
                unit_price: item.price,
                quantity: req.quantity,
            });
        }

        // 4. Persist header and lines as one atomic unit
        let order = Order::create(customer_id, store_id, lines).map_err(|_| OrderError::EmptyLines)?;
        self.storage.insert_order(&order)?;

        info!(
            order_id = %order.id(),
            %customer_id,
            %store_id,
            total_amount = order.total_amount(),
            "order created"
        );
        Ok(order.id())
    }

    /// Load the full aggregate including lines
    pub async fn get_by_id(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.storage
            .get_order(order_id)?
            .ok_or(OrderError::NotFound(order_id))
    }

    /// All orders of a customer (read-only reporting access)
    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, OrderError> {
        Ok(self.storage.orders_for_customer(customer_id)?)
    }

    /// `PENDING_PAYMENT -> PAID`
    pub async fn mark_paid(&self, order_id: Uuid) -> Result<(), OrderError> {
        self.transition(order_id, Order::mark_paid)?;
        info!(%order_id, "order marked paid");
        Ok(())
    }

    /// `PAID -> PREPARING`
    pub async fn start_preparing(&self, order_id: Uuid) -> Result<(), OrderError> {
        self.transition(order_id, Order::start_preparing)?;
        info!(%order_id, "order preparation started");
        Ok(())
    }

    /// `PREPARING -> DELIVERING`
    pub async fn start_delivery(&self, order_id: Uuid) -> Result<(), OrderError> {
        self.transition(order_id, Order::start_delivery)?;
        info!(%order_id, "order out for delivery");
        Ok(())
    }

    /// `DELIVERING -> COMPLETED`
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<(), OrderError> {
        self.transition(order_id, Order::mark_delivered)?;
        info!(%order_id, "order delivered");
        Ok(())
    }

    /// Cancel; legal only while `PENDING_PAYMENT` or `PAID`
    pub async fn cancel(&self, order_id: Uuid) -> Result<(), OrderError> {
        self.transition(order_id, Order::cancel)?;
        info!(%order_id, "order cancelled");
        Ok(())
    }

    /// Load, transition, and store inside one write transaction
    fn transition<F>(&self, order_id: Uuid, f: F) -> Result<Order, OrderError>
    where
        F: FnOnce(&mut Order) -> Result<(), InvalidOrderTransition>,
    {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or(OrderError::NotFound(order_id))?;
        f(&mut order)?;
        self.storage.put_order_txn(&txn, &order)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::directory::InMemoryDirectory;
    use shared::models::{MenuItem, MenuItemStatus, OrderStatus};

    struct Fixture {
        workflow: OrderWorkflow,
        catalog: Arc<InMemoryCatalog>,
        store_id: Uuid,
    }

    fn fixture() -> Fixture {
        let storage = Storage::open_in_memory().unwrap();
        let catalog = Arc::new(InMemoryCatalog::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let store_id = Uuid::new_v4();
        directory.register_store(store_id);
        let workflow = OrderWorkflow::new(storage, catalog.clone(), directory);
        Fixture {
            workflow,
            catalog,
            store_id,
        }
    }

    fn menu_item(store_id: Uuid, name: &str, price: i64) -> MenuItem {
        MenuItem {
            id: Uuid::new_v4(),
            store_id,
            name: name.to_string(),
            price,
            status: MenuItemStatus::Available,
        }
    }

    #[tokio::test]
    async fn create_uses_server_side_prices() {
        let f = fixture();
        let item = f.catalog.upsert(menu_item(f.store_id, "Fried chicken", 1500));

        let order_id = f
            .workflow
            .create(
                Uuid::new_v4(),
                f.store_id,
                &[RequestedLine {
                    menu_item_id: item,
                    quantity: 3,
                }],
            )
            .await
            .unwrap();

        let order = f.workflow.get_by_id(order_id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::PendingPayment);
        assert_eq!(order.total_amount(), 4500);
        assert_eq!(order.lines()[0].name, "Fried chicken");
        assert_eq!(order.lines()[0].unit_price, 1500);
    }

    #[tokio::test]
    async fn later_price_change_does_not_touch_existing_orders() {
        let f = fixture();
        let item = f.catalog.upsert(menu_item(f.store_id, "Cola", 500));
        let order_id = f
            .workflow
            .create(Uuid::new_v4(), f.store_id, &[RequestedLine { menu_item_id: item, quantity: 2 }])
            .await
            .unwrap();

        f.catalog.update_price(item, 900);

        let order = f.workflow.get_by_id(order_id).await.unwrap();
        assert_eq!(order.lines()[0].unit_price, 500);
        assert_eq!(order.total_amount(), 1000);
    }

    #[tokio::test]
    async fn create_validates_its_input() {
        let f = fixture();
        let customer = Uuid::new_v4();

        assert!(matches!(
            f.workflow.create(customer, f.store_id, &[]).await.unwrap_err(),
            OrderError::EmptyLines
        ));

        let item = f.catalog.upsert(menu_item(f.store_id, "Cola", 500));
        assert!(matches!(
            f.workflow
                .create(customer, f.store_id, &[RequestedLine { menu_item_id: item, quantity: 0 }])
                .await
                .unwrap_err(),
            OrderError::InvalidQuantity(0)
        ));

        let unknown_store = Uuid::new_v4();
        assert!(matches!(
            f.workflow
                .create(customer, unknown_store, &[RequestedLine { menu_item_id: item, quantity: 1 }])
                .await
                .unwrap_err(),
            OrderError::StoreNotFound(_)
        ));
    }

    #[tokio::test]
    async fn missing_and_unavailable_items_are_rejected() {
        let f = fixture();
        let customer = Uuid::new_v4();

        let missing = Uuid::new_v4();
        assert!(matches!(
            f.workflow
                .create(customer, f.store_id, &[RequestedLine { menu_item_id: missing, quantity: 1 }])
                .await
                .unwrap_err(),
            OrderError::MenuItemNotFound(id) if id == missing
        ));

        let sold_out = f.catalog.upsert(menu_item(f.store_id, "Tteokbokki", 6000));
        f.catalog.set_status(sold_out, MenuItemStatus::Unavailable);
        assert!(matches!(
            f.workflow
                .create(customer, f.store_id, &[RequestedLine { menu_item_id: sold_out, quantity: 1 }])
                .await
                .unwrap_err(),
            OrderError::MenuItemUnavailable(id) if id == sold_out
        ));
    }

    #[tokio::test]
    async fn item_from_another_store_is_rejected() {
        let f = fixture();
        let foreign_item = f.catalog.upsert(menu_item(Uuid::new_v4(), "Sushi", 12000));

        assert!(matches!(
            f.workflow
                .create(
                    Uuid::new_v4(),
                    f.store_id,
                    &[RequestedLine { menu_item_id: foreign_item, quantity: 1 }]
                )
                .await
                .unwrap_err(),
            OrderError::MenuItemWrongStore { .. }
        ));
    }

    #[tokio::test]
    async fn full_transition_chain_and_timestamps() {
        let f = fixture();
        let item = f.catalog.upsert(menu_item(f.store_id, "Fried chicken", 1500));
        let order_id = f
            .workflow
            .create(Uuid::new_v4(), f.store_id, &[RequestedLine { menu_item_id: item, quantity: 1 }])
            .await
            .unwrap();

        f.workflow.mark_paid(order_id).await.unwrap();
        f.workflow.start_preparing(order_id).await.unwrap();
        f.workflow.start_delivery(order_id).await.unwrap();
        f.workflow.mark_delivered(order_id).await.unwrap();

        let order = f.workflow.get_by_id(order_id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert!(order.paid_at().is_some());
        assert!(order.completed_at().is_some());
    }

    #[tokio::test]
    async fn second_cancel_is_rejected() {
        let f = fixture();
        let item = f.catalog.upsert(menu_item(f.store_id, "Cola", 500));
        let order_id = f
            .workflow
            .create(Uuid::new_v4(), f.store_id, &[RequestedLine { menu_item_id: item, quantity: 1 }])
            .await
            .unwrap();

        f.workflow.cancel(order_id).await.unwrap();
        assert!(matches!(
            f.workflow.cancel(order_id).await.unwrap_err(),
            OrderError::InvalidTransition(_)
        ));

        let order = f.workflow.get_by_id(order_id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_after_delivery_started_is_rejected() {
        let f = fixture();
        let item = f.catalog.upsert(menu_item(f.store_id, "Cola", 500));
        let order_id = f
            .workflow
            .create(Uuid::new_v4(), f.store_id, &[RequestedLine { menu_item_id: item, quantity: 1 }])
            .await
            .unwrap();

        f.workflow.mark_paid(order_id).await.unwrap();
        f.workflow.start_preparing(order_id).await.unwrap();
        f.workflow.start_delivery(order_id).await.unwrap();

        assert!(matches!(
            f.workflow.cancel(order_id).await.unwrap_err(),
            OrderError::InvalidTransition(_)
        ));
    }

    #[tokio::test]
    async fn transitions_on_unknown_order_fail() {
        let f = fixture();
        let ghost = Uuid::new_v4();
        assert!(matches!(
            f.workflow.mark_paid(ghost).await.unwrap_err(),
            OrderError::NotFound(id) if id == ghost
        ));
        assert!(matches!(
            f.workflow.get_by_id(ghost).await.unwrap_err(),
            OrderError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn list_for_customer_returns_all_their_orders() {
        let f = fixture();
        let customer = Uuid::new_v4();
        let item = f.catalog.upsert(menu_item(f.store_id, "Cola", 500));
        let req = [RequestedLine { menu_item_id: item, quantity: 1 }];

        f.workflow.create(customer, f.store_id, &req).await.unwrap();
        f.workflow.create(customer, f.store_id, &req).await.unwrap();
        f.workflow.create(Uuid::new_v4(), f.store_id, &req).await.unwrap();

        let orders = f.workflow.list_for_customer(customer).await.unwrap();
        assert_eq!(orders.len(), 2);
    }
}

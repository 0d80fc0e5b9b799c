//! Pricing lookup - the menu catalog collaborator
//!
//! The order workflow never trusts client-supplied prices; at order
//! creation every requested line is resolved through this trait and
//! the returned name/price become the order line values.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::AppError;
use shared::models::{MenuItem, MenuItemStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// Resolves current name, price, and availability for a menu item
#[async_trait]
pub trait PricingLookup: Send + Sync {
    /// Look up a menu item by id; `None` when the item does not exist
    ///
    /// Infrastructure failures propagate as a generic [`AppError`];
    /// the core never retries them itself.
    async fn find_menu_item(&self, menu_item_id: Uuid) -> Result<Option<MenuItem>, AppError>;
}

/// In-memory catalog for tests and embedding
///
/// A lock-guarded map of menu items, mutable out of band the way a
/// real menu is: price updates and availability flips affect future
/// lookups only, never existing orders.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<Uuid, MenuItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a menu item, returning its id
    pub fn upsert(&self, item: MenuItem) -> Uuid {
        let id = item.id;
        self.items.write().insert(id, item);
        id
    }

    /// Change the price of an existing item; a no-op if absent
    pub fn update_price(&self, menu_item_id: Uuid, price: i64) {
        if let Some(item) = self.items.write().get_mut(&menu_item_id) {
            item.price = price;
        }
    }

    /// Change the availability of an existing item; a no-op if absent
    pub fn set_status(&self, menu_item_id: Uuid, status: MenuItemStatus) {
        if let Some(item) = self.items.write().get_mut(&menu_item_id) {
            item.status = status;
        }
    }
}

#[async_trait]
impl PricingLookup for InMemoryCatalog {
    async fn find_menu_item(&self, menu_item_id: Uuid) -> Result<Option<MenuItem>, AppError> {
        Ok(self.items.read().get(&menu_item_id).cloned())
    }
}

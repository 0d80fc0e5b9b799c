//! Menu item model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Menu item availability status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuItemStatus {
    #[default]
    Available,
    Unavailable,
}

/// A sellable menu item as resolved by the pricing lookup
///
/// `price` is in minor currency units and is the only price source the
/// order workflow trusts; client-supplied prices are never used for
/// order creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItem {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    /// Unit price in minor currency units
    pub price: i64,
    pub status: MenuItemStatus,
}

impl MenuItem {
    pub fn is_available(&self) -> bool {
        self.status == MenuItemStatus::Available
    }
}

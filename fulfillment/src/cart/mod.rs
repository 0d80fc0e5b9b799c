//! Cart store - one ephemeral cart per customer
//!
//! Mutations follow a compare-and-swap loop against the versioned
//! cache: read the cart and its version, apply the change, store
//! conditionally, retry on conflict. Every successful mutation
//! refreshes the idle-expiry window; plain reads do not.

mod cache;

pub use cache::CartCache;

use shared::models::{Cart, CartLine};
use shared::{AppError, ErrorCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Idle window after which an untouched cart disappears
pub const DEFAULT_CART_TTL: Duration = Duration::from_secs(60 * 60);

/// Maximum quantity for a single cart line, merged total included
const MAX_QUANTITY: i32 = 9999;

/// Maximum unit price in minor currency units
const MAX_UNIT_PRICE: i64 = 100_000_000;

/// Cart operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be between 1 and {MAX_QUANTITY}, got {0}")]
    InvalidQuantity(i32),

    #[error("unit price must be between 0 and {MAX_UNIT_PRICE}, got {0}")]
    InvalidUnitPrice(i64),

    #[error("cart holds items from store {cart_store_id}, cannot add from store {item_store_id}")]
    DifferentStore {
        cart_store_id: Uuid,
        item_store_id: Uuid,
    },
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidQuantity(got) => {
                AppError::validation(err.to_string()).with_detail("quantity", got)
            }
            CartError::InvalidUnitPrice(got) => {
                AppError::with_message(ErrorCode::ValueOutOfRange, err.to_string())
                    .with_detail("unit_price", got)
            }
            CartError::DifferentStore { cart_store_id, .. } => {
                AppError::with_message(ErrorCode::CartDifferentStore, err.to_string())
                    .with_detail("cart_store_id", cart_store_id.to_string())
            }
        }
    }
}

/// Store holding one cart per customer in an expiring versioned cache
#[derive(Clone)]
pub struct CartStore {
    cache: Arc<CartCache>,
}

impl CartStore {
    /// Create a store with the default 1 hour idle TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CART_TTL)
    }

    /// Create a store with a custom idle TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(CartCache::new(ttl)),
        }
    }

    /// Add a line to the customer's cart
    ///
    /// Rejects unit prices outside 0..=100_000_000, quantities outside
    /// 1..=9999, and lines from a store other than the one the cart is
    /// bound to (the cart must be cleared before switching stores). A
    /// line for an already-present menu item merges into it by adding
    /// quantities; the quantity bound applies to the merged total, so
    /// a cart never holds a line the checkout would reject. Returns
    /// the updated cart.
    pub fn add_item(&self, customer_id: Uuid, line: CartLine) -> Result<Cart, CartError> {
        if line.quantity < 1 || line.quantity > MAX_QUANTITY {
            return Err(CartError::InvalidQuantity(line.quantity));
        }
        if line.unit_price < 0 || line.unit_price > MAX_UNIT_PRICE {
            return Err(CartError::InvalidUnitPrice(line.unit_price));
        }

        loop {
            let (current, version) = self.cache.load(customer_id);
            let mut cart = current.unwrap_or_else(|| Cart::new(customer_id));

            if !cart.accepts_store(line.store_id) {
                return Err(CartError::DifferentStore {
                    // accepts_store only fails on a non-empty cart
                    cart_store_id: cart.store_id.unwrap_or_default(),
                    item_store_id: line.store_id,
                });
            }
            let merged = cart
                .lines()
                .iter()
                .find(|l| l.menu_item_id == line.menu_item_id)
                .map_or(line.quantity, |l| l.quantity + line.quantity);
            if merged > MAX_QUANTITY {
                return Err(CartError::InvalidQuantity(merged));
            }
            cart.add_line(line.clone());

            if self.cache.store(customer_id, version, cart.clone()) {
                debug!(%customer_id, menu_item_id = %line.menu_item_id, "cart line added");
                return Ok(cart);
            }
            // Lost the write race; retry against the fresh cart
        }
    }

    /// Remove a menu item from the customer's cart
    ///
    /// Idempotent: removing an absent item (or from an absent cart) is
    /// a no-op. Removing the last line unbinds the store. Returns the
    /// resulting cart.
    pub fn remove_item(&self, customer_id: Uuid, menu_item_id: Uuid) -> Cart {
        loop {
            let (current, version) = self.cache.load(customer_id);
            let Some(mut cart) = current else {
                // No stored cart: already removed as far as the caller
                // can tell
                return Cart::new(customer_id);
            };

            cart.remove_line(menu_item_id);
            if self.cache.store(customer_id, version, cart.clone()) {
                debug!(%customer_id, %menu_item_id, "cart line removed");
                return cart;
            }
        }
    }

    /// Current cart for the customer; a fresh empty cart if none is
    /// stored
    pub fn get_cart(&self, customer_id: Uuid) -> Cart {
        self.cache
            .load(customer_id)
            .0
            .unwrap_or_else(|| Cart::new(customer_id))
    }

    /// Delete the customer's cart immediately (no TTL wait)
    pub fn clear(&self, customer_id: Uuid) {
        self.cache.remove(customer_id);
        debug!(%customer_id, "cart cleared");
    }

    /// Drop expired carts, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    /// Spawn a background task that purges expired carts periodically
    pub fn spawn_expiry_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "purged expired carts");
                }
            }
        })
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

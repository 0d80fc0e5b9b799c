//! Cart model - a customer's pending selection from exactly one store
//!
//! The cart lives in an expiring cache and is only a display snapshot;
//! authoritative prices are re-resolved at order creation. Invariants
//! owned here: all lines share the cart's store, merging a duplicate
//! menu item increases its quantity instead of appending a second
//! line, and removing the last line resets the store binding.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One menu item in a cart: price snapshot plus a quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub menu_item_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    /// Unit price snapshot in minor currency units (display only)
    pub unit_price: i64,
    pub quantity: i32,
}

impl CartLine {
    /// Line total: unit price times quantity
    pub fn line_amount(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// A customer's cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cart {
    pub customer_id: Uuid,
    /// Store the cart is bound to; `None` until the first item is added
    pub store_id: Option<Uuid>,
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create a new empty cart for a customer
    pub fn new(customer_id: Uuid) -> Self {
        Self {
            customer_id,
            store_id: None,
            lines: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether a line from the given store may join this cart
    ///
    /// An empty cart accepts any store; a non-empty cart only accepts
    /// its own store.
    pub fn accepts_store(&self, store_id: Uuid) -> bool {
        match self.store_id {
            None => true,
            Some(bound) => bound == store_id,
        }
    }

    /// Add a line, merging quantity into an existing line for the same
    /// menu item
    ///
    /// Callers must have checked [`Cart::accepts_store`] first; this
    /// method binds the store on first add.
    pub fn add_line(&mut self, line: CartLine) {
        debug_assert!(self.accepts_store(line.store_id));
        self.store_id = Some(line.store_id);
        match self
            .lines
            .iter_mut()
            .find(|l| l.menu_item_id == line.menu_item_id)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => self.lines.push(line),
        }
    }

    /// Remove the line for a menu item; a no-op if absent
    ///
    /// Resets the store binding when the last line goes away.
    pub fn remove_line(&mut self, menu_item_id: Uuid) {
        self.lines.retain(|l| l.menu_item_id != menu_item_id);
        if self.lines.is_empty() {
            self.store_id = None;
        }
    }

    /// Sum of all line amounts in minor currency units
    pub fn total_amount(&self) -> i64 {
        self.lines.iter().map(CartLine::line_amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(menu_item_id: Uuid, store_id: Uuid, price: i64, quantity: i32) -> CartLine {
        CartLine {
            menu_item_id,
            store_id,
            name: "Test item".to_string(),
            unit_price: price,
            quantity,
        }
    }

    #[test]
    fn first_add_binds_store() {
        let store = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        assert!(cart.accepts_store(store));

        cart.add_line(line(Uuid::new_v4(), store, 1000, 2));
        assert_eq!(cart.store_id, Some(store));
        assert_eq!(cart.total_amount(), 2000);
    }

    #[test]
    fn duplicate_menu_item_merges_quantity() {
        let store = Uuid::new_v4();
        let item = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());

        cart.add_line(line(item, store, 1500, 1));
        cart.add_line(line(item, store, 1500, 3));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 4);
        assert_eq!(cart.total_amount(), 6000);
    }

    #[test]
    fn other_store_is_rejected_while_non_empty() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_line(line(Uuid::new_v4(), Uuid::new_v4(), 1000, 1));
        assert!(!cart.accepts_store(Uuid::new_v4()));
    }

    #[test]
    fn removing_last_line_resets_store() {
        let item = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_line(line(item, Uuid::new_v4(), 1000, 1));

        cart.remove_line(item);
        assert!(cart.is_empty());
        assert_eq!(cart.store_id, None);
        // Cart is open to any store again
        assert!(cart.accepts_store(Uuid::new_v4()));
    }

    #[test]
    fn removing_absent_item_is_a_no_op() {
        let item = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_line(line(item, Uuid::new_v4(), 1000, 2));

        let before = cart.clone();
        cart.remove_line(Uuid::new_v4());
        assert_eq!(cart, before);
    }
}

//! Expiring versioned cart cache
//!
//! In-process stand-in for the expiring key-value store carts live in.
//! Every entry carries a version; writes are conditional on the
//! version the writer read, so two concurrent read-modify-write cycles
//! cannot silently lose an update - the loser's store fails and it
//! retries against the fresh value.
//!
//! Expiry is a sliding idle window: each successful store pushes
//! `expires_at` out by the full TTL. Expired entries read as absent
//! (version 0) and are physically removed by [`CartCache::purge_expired`].

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::models::Cart;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct CacheEntry {
    cart: Cart,
    version: u64,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Versioned expiring map from customer id to cart
pub struct CartCache {
    entries: DashMap<Uuid, CacheEntry>,
    ttl: Duration,
}

impl CartCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read the current cart and its version
    ///
    /// Absent and expired entries both read as `(None, 0)`; version 0
    /// is the expected version for a first write.
    pub fn load(&self, customer_id: Uuid) -> (Option<Cart>, u64) {
        match self.entries.get(&customer_id) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                (Some(entry.cart.clone()), entry.version)
            }
            _ => (None, 0),
        }
    }

    /// Conditionally store a cart, refreshing its TTL
    ///
    /// Succeeds only if the live version still equals
    /// `expected_version` (with expired entries counting as version 0).
    /// Returns `false` when another writer got there first; the caller
    /// re-reads and retries.
    pub fn store(&self, customer_id: Uuid, expected_version: u64, cart: Cart) -> bool {
        let now = Instant::now();
        let expires_at = now + self.ttl;
        match self.entries.entry(customer_id) {
            Entry::Occupied(mut occupied) => {
                let current = if occupied.get().is_expired(now) {
                    0
                } else {
                    occupied.get().version
                };
                if current != expected_version {
                    return false;
                }
                occupied.insert(CacheEntry {
                    cart,
                    version: current + 1,
                    expires_at,
                });
                true
            }
            Entry::Vacant(vacant) => {
                if expected_version != 0 {
                    return false;
                }
                vacant.insert(CacheEntry {
                    cart,
                    version: 1,
                    expires_at,
                });
                true
            }
        }
    }

    /// Delete an entry immediately, without waiting for the TTL
    pub fn remove(&self, customer_id: Uuid) {
        self.entries.remove(&customer_id);
    }

    /// Drop all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart(customer_id: Uuid) -> Cart {
        Cart::new(customer_id)
    }

    #[test]
    fn first_store_requires_version_zero() {
        let cache = CartCache::new(Duration::from_secs(60));
        let customer = Uuid::new_v4();

        assert!(!cache.store(customer, 3, cart(customer)));
        assert!(cache.store(customer, 0, cart(customer)));

        let (loaded, version) = cache.load(customer);
        assert!(loaded.is_some());
        assert_eq!(version, 1);
    }

    #[test]
    fn stale_version_is_rejected() {
        let cache = CartCache::new(Duration::from_secs(60));
        let customer = Uuid::new_v4();
        assert!(cache.store(customer, 0, cart(customer)));

        // A writer holding the old version loses
        assert!(!cache.store(customer, 0, cart(customer)));
        assert!(cache.store(customer, 1, cart(customer)));
        let (_, version) = cache.load(customer);
        assert_eq!(version, 2);
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let cache = CartCache::new(Duration::from_millis(20));
        let customer = Uuid::new_v4();
        assert!(cache.store(customer, 0, cart(customer)));

        std::thread::sleep(Duration::from_millis(40));
        let (loaded, version) = cache.load(customer);
        assert!(loaded.is_none());
        assert_eq!(version, 0);

        // And a fresh write starts over at version 0
        assert!(cache.store(customer, 0, cart(customer)));
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let cache = CartCache::new(Duration::from_millis(20));
        let stale = Uuid::new_v4();
        cache.store(stale, 0, cart(stale));

        std::thread::sleep(Duration::from_millis(40));
        let fresh = Uuid::new_v4();
        cache.store(fresh, 0, cart(fresh));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.load(fresh).0.is_some());
    }
}

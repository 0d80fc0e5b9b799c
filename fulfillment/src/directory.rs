//! Store and address directories
//!
//! Existence checks only; stores and addresses are owned elsewhere.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::AppError;
use std::collections::HashSet;
use uuid::Uuid;

/// Existence check for stores
#[async_trait]
pub trait StoreDirectory: Send + Sync {
    async fn store_exists(&self, store_id: Uuid) -> Result<bool, AppError>;
}

/// Existence check for delivery destination addresses
#[async_trait]
pub trait AddressDirectory: Send + Sync {
    async fn address_exists(&self, address_id: Uuid) -> Result<bool, AppError>;
}

/// In-memory directory for tests and embedding
#[derive(Default)]
pub struct InMemoryDirectory {
    stores: RwLock<HashSet<Uuid>>,
    addresses: RwLock<HashSet<Uuid>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_store(&self, store_id: Uuid) {
        self.stores.write().insert(store_id);
    }

    pub fn register_address(&self, address_id: Uuid) {
        self.addresses.write().insert(address_id);
    }
}

#[async_trait]
impl StoreDirectory for InMemoryDirectory {
    async fn store_exists(&self, store_id: Uuid) -> Result<bool, AppError> {
        Ok(self.stores.read().contains(&store_id))
    }
}

#[async_trait]
impl AddressDirectory for InMemoryDirectory {
    async fn address_exists(&self, address_id: Uuid) -> Result<bool, AppError> {
        Ok(self.addresses.read().contains(&address_id))
    }
}

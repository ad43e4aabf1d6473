//! # Purchase Store
//!
//! The persistence seam. The engine never talks to storage directly; the
//! service reads the purchase set through this trait, re-prices it and
//! writes back only what changed.
//!
//! ```text
//! PurchaseService ──list()──────► PurchaseStore ──► remote store / memory
//!                 ◄─Vec<Purchase>─
//!                 ──put_many()───►   (one call per mutation)
//!                 ──delete(id)───►
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use goldbook_core::Purchase;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;

/// Storage for purchases (with their payment histories).
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Every purchase, ordered by date then id.
    async fn list(&self) -> Result<Vec<Purchase>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Purchase>, StoreError>;

    /// Inserts or replaces each purchase by id.
    async fn put_many(&self, purchases: &[Purchase]) -> Result<(), StoreError>;

    /// Removes a purchase; returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// In-process store backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    purchases: RwLock<HashMap<String, Purchase>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Store pre-filled with `purchases`, e.g. from a JSON export.
    pub fn with_purchases(purchases: impl IntoIterator<Item = Purchase>) -> Self {
        InMemoryStore {
            purchases: RwLock::new(purchases.into_iter().map(|p| (p.id.clone(), p)).collect()),
        }
    }

    /// Parses a JSON array of purchases.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let purchases: Vec<Purchase> = serde_json::from_str(json)?;
        Ok(Self::with_purchases(purchases))
    }
}

#[async_trait]
impl PurchaseStore for InMemoryStore {
    async fn list(&self) -> Result<Vec<Purchase>, StoreError> {
        let mut purchases: Vec<Purchase> = self.purchases.read().await.values().cloned().collect();
        purchases.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(purchases)
    }

    async fn get(&self, id: &str) -> Result<Option<Purchase>, StoreError> {
        Ok(self.purchases.read().await.get(id).cloned())
    }

    async fn put_many(&self, purchases: &[Purchase]) -> Result<(), StoreError> {
        let mut map = self.purchases.write().await;
        for purchase in purchases {
            map.insert(purchase.id.clone(), purchase.clone());
        }
        debug!(count = purchases.len(), "Purchases written");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.purchases.write().await.remove(id).is_some())
    }
}

//! Process-local [`FoodCacheStore`] backed by a `HashMap`.
//!
//! Used when no database is configured and as the store in service tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheEntry, FoodCacheStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryFoodCache {
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

impl MemoryFoodCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl FoodCacheStore for MemoryFoodCache {
    async fn get(&self, fdc_id: i64) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.read().await.get(&fdc_id).cloned())
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(entry.fdc_id, entry.clone());
        Ok(())
    }
}

//! # In-Memory Rate Cache
//!
//! Process-local [`ShippingRateCache`] shared by concurrent pricing runs.
//! Reads take the read lock only; expired entries are skipped on read and
//! dropped by `purge_expired`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use checkout_core::{ShippingRateCacheEntry, ShippingRateKey};

use crate::collaborators::ShippingRateCache;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryRateCache {
    entries: RwLock<HashMap<ShippingRateKey, ShippingRateCacheEntry>>,
}

impl InMemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ShippingRateCache for InMemoryRateCache {
    async fn get(
        &self,
        key: &ShippingRateKey,
        now: DateTime<Utc>,
    ) -> Result<Option<ShippingRateCacheEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|e| e.is_fresh(now)).cloned())
    }

    async fn put(&self, entry: ShippingRateCacheEntry) -> Result<(), StoreError> {
        self.entries.write().await.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        let removed = (before - entries.len()) as u64;

        debug!(removed, "Purged expired in-memory shipping rates");
        Ok(removed)
    }
}

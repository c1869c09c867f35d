//! In-process cache backend.

use crate::{CacheBackend, CacheEntry, CacheKey};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::SystemTime;
use tally_error::StorageError;
use tokio::sync::RwLock;

/// Cache backend that keeps entries in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry with an explicit creation time.
    pub async fn insert_at(&self, key: CacheKey, payload: Value, created_at: SystemTime) {
        self.entries
            .write()
            .await
            .insert(key, CacheEntry::new(payload, created_at));
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &CacheKey, payload: &Value) -> Result<(), StorageError> {
        self.insert_at(key.clone(), payload.clone(), SystemTime::now())
            .await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

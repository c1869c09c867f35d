//! Storage backends for cached responses.

use crate::CacheKey;
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, SystemTime};
use tally_error::StorageError;

/// A stored response and the time it was written.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct CacheEntry {
    payload: Value,
    created_at: SystemTime,
}

impl CacheEntry {
    /// Create an entry written at `created_at`.
    pub fn new(payload: Value, created_at: SystemTime) -> Self {
        Self {
            payload,
            created_at,
        }
    }

    /// Time since the entry was written. Entries stamped in the future are
    /// treated as brand new.
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.created_at).unwrap_or(Duration::ZERO)
    }

    /// Whether the entry is younger than `ttl` at `now`.
    pub fn is_fresh_at(&self, ttl: Duration, now: SystemTime) -> bool {
        self.age_at(now) < ttl
    }

    /// Consume the entry, returning the stored response.
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// Storage for cached responses.
///
/// Backends perform no concurrency control beyond making each write atomic:
/// two writers of the same key both succeed and the last one wins.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read the entry stored under `key`, `Ok(None)` if there is none.
    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError>;

    /// Store `payload` under `key`, replacing any previous entry.
    async fn write(&self, key: &CacheKey, payload: &Value) -> Result<(), StorageError>;

    /// Backend name used in logs.
    fn backend_name(&self) -> &'static str;
}

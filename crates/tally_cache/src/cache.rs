//! TTL-bounded read and write-through over a cache backend.

use crate::{CacheBackend, CacheKey};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, instrument, warn};

/// Response cache applying a TTL on read.
///
/// Storage failures never propagate: an unreadable entry is a miss and a
/// failed write is logged and dropped, so the cache can only ever save a
/// network call, not fail a query.
///
/// # Example
///
/// ```rust,ignore
/// let cache = ResponseCache::new(Arc::new(FileCache::new("/tmp/tally")), Duration::from_secs(900));
///
/// if let Some(payload) = cache.lookup(&key).await {
///     return Ok(payload);
/// }
/// let payload = api.fetch(&request, &session).await?;
/// cache.store(&key, &payload).await;
/// ```
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache over `backend`. A zero `ttl` disables caching.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        debug!(
            backend = backend.backend_name(),
            ttl_ms = ttl.as_millis() as u64,
            "Creating response cache"
        );
        Self { backend, ttl }
    }

    /// Whether lookups and stores do anything.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the stored response for `key` if it is younger than the TTL.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn lookup(&self, key: &CacheKey) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }

        let entry = match self.backend.read(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("Cache miss");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Unreadable cache entry, treating as miss");
                return None;
            }
        };

        let now = SystemTime::now();
        if entry.is_fresh_at(self.ttl, now) {
            debug!(age_ms = entry.age_at(now).as_millis() as u64, "Cache hit");
            Some(entry.into_payload())
        } else {
            debug!(age_ms = entry.age_at(now).as_millis() as u64, "Cache entry stale");
            None
        }
    }

    /// Write `payload` under `key`, replacing any previous entry.
    ///
    /// Returns whether the entry was persisted.
    #[instrument(skip(self, key, payload), fields(key = %key))]
    pub async fn store(&self, key: &CacheKey, payload: &Value) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match self.backend.write(key, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to write cache entry");
                false
            }
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("backend", &self.backend.backend_name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

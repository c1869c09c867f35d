//! Per-client tuning knobs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tally_error::ConfigError;

/// Settings for a single client instance.
///
/// Defaults: caching off, `concurrency_limit = 10`, `retry_delay_ms = 1000`,
/// `max_retries = 3`, cache files under the system temp directory.
///
/// # Examples
///
/// ```
/// use tally_core::ClientSettings;
///
/// let settings = ClientSettings::default().with_cache_ttl_ms(15 * 60 * 1000);
/// assert!(settings.is_cache_enabled());
/// assert_eq!(*settings.concurrency_limit(), 10);
///
/// let built = ClientSettings::builder().max_retries(5usize).build().unwrap();
/// assert_eq!(*built.max_retries(), 5);
/// assert_eq!(*built.retry_delay_ms(), 1000);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct ClientSettings {
    /// Cache entry lifetime in milliseconds (0 disables caching)
    #[serde(default)]
    cache_ttl_ms: u64,

    /// Directory holding cache entries and session files
    #[serde(default = "default_cache_dir")]
    cache_dir: PathBuf,

    /// Maximum number of outstanding network calls
    #[serde(default = "default_concurrency_limit")]
    concurrency_limit: usize,

    /// Fixed delay before resubmitting a rate-limited call (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    retry_delay_ms: u64,

    /// Resubmissions allowed after the first attempt
    #[serde(default = "default_max_retries")]
    max_retries: usize,
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_concurrency_limit() -> usize {
    10
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> usize {
    3
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 0,
            cache_dir: default_cache_dir(),
            concurrency_limit: default_concurrency_limit(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl ClientSettings {
    /// Creates a new settings builder.
    pub fn builder() -> ClientSettingsBuilder {
        ClientSettingsBuilder::default()
    }

    /// Whether responses are read from and written to the cache.
    pub fn is_cache_enabled(&self) -> bool {
        self.cache_ttl_ms > 0
    }

    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Backoff between rate-limited attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Reject settings that could never admit a request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::new("concurrency_limit must be at least 1"));
        }
        Ok(())
    }
}

//! Tests for client settings defaults and validation.

use std::time::Duration;
use tally_core::ClientSettings;

#[test]
fn test_defaults() {
    let settings = ClientSettings::default();
    assert_eq!(*settings.cache_ttl_ms(), 0);
    assert!(!settings.is_cache_enabled());
    assert_eq!(*settings.concurrency_limit(), 10);
    assert_eq!(settings.retry_delay(), Duration::from_millis(1000));
    assert_eq!(*settings.max_retries(), 3);
    assert_eq!(settings.cache_dir(), &std::env::temp_dir());
}

#[test]
fn test_partial_json_uses_defaults() -> anyhow::Result<()> {
    let settings: ClientSettings =
        serde_json::from_str(r#"{"cache_ttl_ms": 900000, "concurrency_limit": 2}"#)?;
    assert_eq!(settings.cache_ttl(), Duration::from_secs(900));
    assert_eq!(*settings.concurrency_limit(), 2);
    assert_eq!(*settings.max_retries(), 3);
    Ok(())
}

#[test]
fn test_zero_concurrency_is_invalid() {
    let settings = ClientSettings::default().with_concurrency_limit(0);
    let err = settings.validate().unwrap_err();
    assert!(err.message.contains("concurrency_limit"));
    assert!(ClientSettings::default().validate().is_ok());
}

//! Tests for session reuse and persistence.

mod test_utils;

use chrono::{Duration, Utc};
use std::sync::Arc;
use tally_core::SessionCredential;
use tally_rate_limit::AdmissionController;
use tally_session::{
    CredentialManager, FileSessionStore, MemorySessionStore, SessionStore, session_file_name,
};
use test_utils::{MockAuthorizer, account};

fn manager(
    store: Arc<dyn SessionStore>,
    authorizer: Arc<MockAuthorizer>,
) -> CredentialManager {
    CredentialManager::new(store, authorizer, AdmissionController::new(10))
}

#[tokio::test]
async fn test_first_call_authorizes_and_persists() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileSessionStore::new(dir.path()));
    let authorizer = Arc::new(MockAuthorizer::new_success(Duration::hours(1)));
    let manager = manager(store.clone(), authorizer.clone());

    let session = manager.authorize(&account()).await?;
    assert_eq!(session.access_token(), "reporter@example.com-token-1");
    assert_eq!(authorizer.call_count(), 1);

    let path = dir.path().join(session_file_name("reporter@example.com"));
    assert_eq!(path, store.session_path("reporter@example.com"));
    let persisted: SessionCredential = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    assert_eq!(persisted, session);

    let again = manager.authorize(&account()).await?;
    assert_eq!(again, session);
    assert_eq!(authorizer.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_persisted_session_survives_new_manager() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let first = Arc::new(MockAuthorizer::new_success(Duration::hours(1)));
    let session = manager(Arc::new(FileSessionStore::new(dir.path())), first.clone())
        .authorize(&account())
        .await?;

    let second = Arc::new(MockAuthorizer::new_success(Duration::hours(1)));
    let reused = manager(Arc::new(FileSessionStore::new(dir.path())), second.clone())
        .authorize(&account())
        .await?;

    assert_eq!(reused, session);
    assert_eq!(second.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_expired_session_is_replaced() -> anyhow::Result<()> {
    let store = Arc::new(MemorySessionStore::new());
    let stale = SessionCredential::new("old", None, Utc::now() - Duration::seconds(1));
    store.save("reporter@example.com", &stale).await?;

    let authorizer = Arc::new(MockAuthorizer::new_success(Duration::hours(1)));
    let session = manager(store.clone(), authorizer.clone())
        .authorize(&account())
        .await?;

    assert_ne!(session.access_token(), "old");
    assert_eq!(authorizer.call_count(), 1);
    assert_eq!(store.load("reporter@example.com").await?, Some(session));
    Ok(())
}

#[tokio::test]
async fn test_remembered_session_is_revalidated() -> anyhow::Result<()> {
    let authorizer = Arc::new(MockAuthorizer::new_success(Duration::zero()));
    let manager = manager(Arc::new(MemorySessionStore::new()), authorizer.clone());

    manager.authorize(&account()).await?;
    manager.authorize(&account()).await?;
    assert_eq!(authorizer.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_session_file_is_a_miss() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileSessionStore::new(dir.path()));
    std::fs::write(store.session_path("reporter@example.com"), "{\"access_token\":")?;

    let authorizer = Arc::new(MockAuthorizer::new_success(Duration::hours(1)));
    let session = manager(store.clone(), authorizer.clone())
        .authorize(&account())
        .await?;

    assert_eq!(authorizer.call_count(), 1);
    assert_eq!(store.load("reporter@example.com").await?, Some(session));
    Ok(())
}

#[tokio::test]
async fn test_handshake_failure_is_surfaced_and_not_persisted() -> anyhow::Result<()> {
    let store = Arc::new(MemorySessionStore::new());
    let authorizer = Arc::new(MockAuthorizer::new_error());

    let result = manager(store.clone(), authorizer).authorize(&account()).await;
    assert!(result.is_err());
    assert_eq!(store.load("reporter@example.com").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_persist_failure_still_returns_session() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x")?;

    let authorizer = Arc::new(MockAuthorizer::new_success(Duration::hours(1)));
    let session = manager(Arc::new(FileSessionStore::new(&blocker)), authorizer)
        .authorize(&account())
        .await?;
    assert!(session.is_valid());
    Ok(())
}

#[tokio::test]
async fn test_handshake_occupies_a_shared_slot() -> anyhow::Result<()> {
    let admission = AdmissionController::new(1);
    let authorizer = Arc::new(
        MockAuthorizer::new_success(Duration::hours(1)).observing(admission.clone()),
    );
    let manager = CredentialManager::new(
        Arc::new(MemorySessionStore::new()),
        authorizer.clone(),
        admission.clone(),
    );

    manager.authorize(&account()).await?;
    assert_eq!(authorizer.observed_in_flight(), vec![1]);
    assert_eq!(admission.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn test_absent_session_file_loads_as_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileSessionStore::new(dir.path());

    assert!(store.load("reporter@example.com").await?.is_none());
    assert!(!store.session_path("reporter@example.com").exists());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_simultaneous_misses_each_handshake() -> anyhow::Result<()> {
    let admission = AdmissionController::new(2);
    let authorizer = Arc::new(
        MockAuthorizer::new_success(Duration::hours(1))
            .with_latency(std::time::Duration::from_millis(50))
            .observing(admission.clone()),
    );
    let store = Arc::new(MemorySessionStore::new());
    let manager = CredentialManager::new(store.clone(), authorizer.clone(), admission.clone());

    let account_a = account();
    let account_b = account();
    let (a, b) = tokio::join!(manager.authorize(&account_a), manager.authorize(&account_b));
    let (a, b) = (a?, b?);

    assert_eq!(authorizer.call_count(), 2);
    assert_ne!(a.access_token(), b.access_token());
    assert_eq!(authorizer.observed_in_flight(), vec![1, 2]);
    assert_eq!(admission.in_flight(), 0);

    let persisted = store.load("reporter@example.com").await?.expect("session persisted");
    assert!(persisted == a || persisted == b);
    Ok(())
}

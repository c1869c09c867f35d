//! Persistent storage for session credentials, one entry per account.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tally_core::SessionCredential;
use tally_error::{StorageError, StorageErrorKind};
use tokio::sync::RwLock;

/// Storage for session credentials keyed by account identity.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session persisted for `identity`, `Ok(None)` if there is none.
    async fn load(&self, identity: &str) -> Result<Option<SessionCredential>, StorageError>;

    /// Persist `session` for `identity`, replacing any previous one.
    async fn save(&self, identity: &str, session: &SessionCredential) -> Result<(), StorageError>;

    /// Backend name used in logs.
    fn backend_name(&self) -> &'static str;
}

/// File name of the session persisted for `identity`.
///
/// Every character outside `[A-Za-z-]` is replaced with `_`.
///
/// ```
/// use tally_session::session_file_name;
///
/// assert_eq!(
///     session_file_name("reporter@proj-1.iam.example.com"),
///     "tally-session-reporter_proj-__iam_example_com"
/// );
/// ```
pub fn session_file_name(identity: &str) -> String {
    let sanitized: String = identity
        .chars()
        .map(|c| if c.is_ascii_alphabetic() || c == '-' { c } else { '_' })
        .collect();
    format!("tally-session-{}", sanitized)
}

/// Session store writing one JSON file per account.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory holding the session files.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the session file for `identity`.
    pub fn session_path(&self, identity: &str) -> PathBuf {
        self.base_path.join(session_file_name(identity))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, identity: &str) -> Result<Option<SessionCredential>, StorageError> {
        let path = self.session_path(identity);

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                ))));
            }
        };

        serde_json::from_str(&data).map(Some).map_err(|e| {
            StorageError::new(StorageErrorKind::Serialization(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })
    }

    #[tracing::instrument(skip(self, session))]
    async fn save(&self, identity: &str, session: &SessionCredential) -> Result<(), StorageError> {
        let data = serde_json::to_string(session)
            .map_err(|e| StorageError::new(StorageErrorKind::Serialization(e.to_string())))?;

        tokio::fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                self.base_path.display(),
                e
            )))
        })?;

        let path = self.session_path(identity);
        tally_cache::write_atomically(&path, data.as_bytes()).await?;
        tracing::debug!(path = %path.display(), "Persisted session");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// Session store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionCredential>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, identity: &str) -> Result<Option<SessionCredential>, StorageError> {
        Ok(self.sessions.read().await.get(identity).cloned())
    }

    async fn save(&self, identity: &str, session: &SessionCredential) -> Result<(), StorageError> {
        self.sessions
            .write()
            .await
            .insert(identity.to_string(), session.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

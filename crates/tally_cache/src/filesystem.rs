//! Filesystem cache backend.
//!
//! One file per key, named by the key's hex digest and holding the
//! JSON-serialized response. The file's modification time is the entry's
//! creation time; rewriting an entry replaces the file and so restarts its
//! lifetime.

use crate::{CacheBackend, CacheEntry, CacheKey};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tally_error::{StorageError, StorageErrorKind};
use uuid::Uuid;

/// Filesystem cache backend.
///
/// Writes go to a uniquely named temp file in the cache directory and are
/// renamed into place, so a reader sees either the old entry or the new one,
/// never a partial file.
#[derive(Debug, Clone)]
pub struct FileCache {
    base_path: PathBuf,
}

impl FileCache {
    /// Create a backend rooted at `base_path`.
    ///
    /// The directory is created lazily on first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory holding the entries.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.base_path.join(key.as_str())
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    #[tracing::instrument(skip(self, key), fields(key = %key))]
    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StorageError> {
        let path = self.entry_path(key);

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

        let created_at = tokio::fs::metadata(&path)
            .await
            .and_then(|meta| meta.modified())
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;

        let payload = serde_json::from_str(&data).map_err(|e| {
            StorageError::new(StorageErrorKind::Serialization(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;

        Ok(Some(CacheEntry::new(payload, created_at)))
    }

    #[tracing::instrument(skip(self, key, payload), fields(key = %key))]
    async fn write(&self, key: &CacheKey, payload: &Value) -> Result<(), StorageError> {
        let data = serde_json::to_string(payload).map_err(|e| {
            StorageError::new(StorageErrorKind::Serialization(e.to_string()))
        })?;

        tokio::fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                self.base_path.display(),
                e
            )))
        })?;

        let path = self.entry_path(key);
        write_atomically(&path, data.as_bytes()).await?;

        tracing::debug!(path = %path.display(), size = data.len(), "Wrote cache entry");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// Write `data` to a sibling temp file, then rename it over `path`.
pub async fn write_atomically(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

    tokio::fs::write(&temp_path, data).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            temp_path.display(),
            e
        )))
    })?;

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))));
    }

    Ok(())
}

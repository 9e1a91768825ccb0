//! Local filesystem blob store.
//!
//! Result media is stored as one file per task, named by the storage key
//! (the task id). The root directory is created on startup.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open (and create if missing) a store rooted at `root`.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::config_error(format!("cannot create {}: {}", root.display(), e)))?;
        info!("Result store at {}", root.display());
        Ok(Self { root })
    }

    /// Create from the `LOCAL_STORAGE_PATH` environment variable.
    pub async fn from_env() -> StorageResult<Self> {
        let root = std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "storage".to_string());
        Self::new(root).await
    }

    /// Resolve a key to its path, rejecting anything that could escape the root.
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
        {
            return Err(StorageError::invalid_key(key));
        }
        Ok(self.root.join(key))
    }

    /// Write a blob, replacing any existing content under the same key.
    pub async fn put_bytes(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        debug!("Storing {} bytes at {}", data.len(), path.display());

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Read a blob back.
    pub async fn read_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(key)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a blob exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// Delete a blob.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key))
            }
            Err(e) => Err(StorageError::DeleteFailed(format!("{}: {}", path.display(), e))),
        }
    }
}

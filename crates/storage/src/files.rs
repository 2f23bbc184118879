//! Blob storage for uploaded book files.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FileStoreError {
    #[error("invalid file key: {0}")]
    InvalidKey(String),

    #[error("file store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Key/value blob storage addressed by slash-separated keys.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns `FileStoreError` if the key is invalid or the write fails.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, FileStoreError>;

    /// Reads the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `FileStoreError` if the key is invalid or the read fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FileStoreError>;

    /// Removes `key`. Returns `true` when something was deleted.
    ///
    /// # Errors
    ///
    /// Returns `FileStoreError` if the key is invalid or the delete fails.
    async fn delete(&self, key: &str) -> Result<bool, FileStoreError>;
}

/// Rejects keys that are empty, absolute, or walk out of the store root.
fn validate_key(key: &str) -> Result<&Path, FileStoreError> {
    let path = Path::new(key);
    if key.trim().is_empty() {
        return Err(FileStoreError::InvalidKey(key.to_owned()));
    }
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(FileStoreError::InvalidKey(key.to_owned()));
    }
    Ok(path)
}

#[derive(Clone, Default)]
pub struct InMemoryFileStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryFileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> FileStoreError {
    FileStoreError::Unavailable(e.to_string())
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, FileStoreError> {
        validate_key(key)?;
        let mut guard = self.files.lock().map_err(poisoned)?;
        guard.insert(key.to_owned(), bytes);
        Ok(key.to_owned())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FileStoreError> {
        validate_key(key)?;
        let guard = self.files.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, FileStoreError> {
        validate_key(key)?;
        let mut guard = self.files.lock().map_err(poisoned)?;
        Ok(guard.remove(key).is_some())
    }
}

/// Stores files below a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, FileStoreError> {
        Ok(self.root.join(validate_key(key)?))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, FileStoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, "stored file");
        Ok(key.to_owned())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FileStoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, FileStoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_store_round_trips_nested_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        let key = store
            .put("user-1/Physics_abc", b"page one".to_vec())
            .await
            .unwrap();
        assert_eq!(key, "user-1/Physics_abc");
        assert!(dir.path().join("user-1").join("Physics_abc").exists());
        assert_eq!(
            store.get(&key).await.unwrap().as_deref(),
            Some(&b"page one"[..])
        );

        assert!(store.delete(&key).await.unwrap());
        assert!(!store.delete(&key).await.unwrap());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_keys_escaping_the_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        for key in ["../outside", "/etc/passwd", "a/../../b", "  "] {
            let err = store.put(key, Vec::new()).await.unwrap_err();
            assert!(matches!(err, FileStoreError::InvalidKey(_)), "{key}");
        }
    }

    #[tokio::test]
    async fn in_memory_store_overwrites() {
        let store = InMemoryFileStore::new();
        store.put("k", vec![1]).await.unwrap();
        store.put("k", vec![2]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![2]));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}

//! File-backed key-value store
//!
//! All entries live in a single JSON object. Writes go to a sibling temp file that is
//! then renamed over the original, so a crash never leaves a half-written store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::traits::{KeyValueStore, StorageError, StorageResult};

pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at `path`, creating its parent directory if needed. The file itself
    /// is created on first write.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create storage directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Corrupt(format!("{}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &data).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable store contents");
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let (mut entries, corrupt) = match self.load().await {
            Ok(entries) => (entries, false),
            Err(StorageError::Corrupt(reason)) => {
                tracing::warn!(%reason, "Resetting corrupt store");
                (BTreeMap::new(), true)
            }
            Err(e) => return Err(e),
        };
        if entries.remove(key).is_none() && !corrupt {
            return Ok(());
        }
        self.save(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set("token", "tok123").await.unwrap();
        store.set("user", r#"{"id":1}"#).await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("token").await.unwrap().as_deref(),
            Some("tok123")
        );
        assert_eq!(
            reopened.get("user").await.unwrap().as_deref(),
            Some(r#"{"id":1}"#)
        );
    }

    #[tokio::test]
    async fn test_file_store_remove_missing_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("session.json"))
            .await
            .unwrap();

        assert!(store.remove("token").await.is_ok());
        assert_eq!(store.get("token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported_then_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert!(matches!(
            store.get("token").await,
            Err(StorageError::Corrupt(_))
        ));

        store.remove("token").await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).await.unwrap();
        store.set("token", "tok123").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

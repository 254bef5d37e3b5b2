use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::traits::{KeyValueStore, StorageResult};

/// In-memory store. State is lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> HashMap<String, String> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("token").await.unwrap(), None);

        store.set("token", "tok123").await.unwrap();
        assert_eq!(store.get("token").await.unwrap().as_deref(), Some("tok123"));

        store.remove("token").await.unwrap();
        store.remove("token").await.unwrap();
        assert!(store.entries().is_empty());
    }
}

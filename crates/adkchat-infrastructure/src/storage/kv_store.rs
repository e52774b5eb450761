//! File-backed [`KeyValueStore`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use adkchat_core::error::{ChatError, Result};
use adkchat_core::store::KeyValueStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::atomic_toml::AtomicTomlFile;
use crate::paths::ChatPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Persists string pairs in `state.toml`.
///
/// Reads are served from an in-memory cache loaded at construction; every
/// write goes through a locked read-modify-write on disk.
#[derive(Clone)]
pub struct FileKeyValueStore {
    cache: Arc<Mutex<BTreeMap<String, String>>>,
    file: Arc<AtomicTomlFile<StoreDocument>>,
}

impl FileKeyValueStore {
    /// Opens the store at the default state file location.
    pub async fn open_default() -> Result<Self> {
        Self::open(ChatPaths::from_env().state_file()?).await
    }

    pub async fn open(path: PathBuf) -> Result<Self> {
        let file = Arc::new(AtomicTomlFile::<StoreDocument>::new(path));
        let loader = Arc::clone(&file);
        let document = tokio::task::spawn_blocking(move || loader.load())
            .await
            .map_err(|e| ChatError::internal(format!("Failed to join task: {}", e)))??
            .unwrap_or_default();

        tracing::debug!(
            "[Store] Loaded {} entries from {}",
            document.entries.len(),
            file.path().display()
        );

        Ok(Self {
            cache: Arc::new(Mutex::new(document.entries)),
            file,
        })
    }

    /// Applies `mutate` to the on-disk entries and mirrors the result in the cache.
    async fn write<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) + Send + 'static,
    {
        let mut cache = self.cache.lock().await;
        let file = Arc::clone(&self.file);
        let entries = tokio::task::spawn_blocking(move || {
            file.update(StoreDocument::default(), |document| {
                mutate(&mut document.entries);
                document.entries.clone()
            })
        })
        .await
        .map_err(|e| ChatError::internal(format!("Failed to join task: {}", e)))??;

        *cache = entries;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.write(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.write(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.write(|entries| entries.clear()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkchat_core::store::{SESSION_ID_KEY, USER_ID_KEY};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");

        let store = FileKeyValueStore::open(path.clone()).await.unwrap();
        store.set(USER_ID_KEY, "u1").await.unwrap();
        store.set(SESSION_ID_KEY, "s1").await.unwrap();
        store.remove(SESSION_ID_KEY).await.unwrap();

        let reopened = FileKeyValueStore::open(path).await.unwrap();
        assert_eq!(reopened.get(USER_ID_KEY).await.unwrap().as_deref(), Some("u1"));
        assert_eq!(reopened.get(SESSION_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_empties_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");

        let store = FileKeyValueStore::open(path.clone()).await.unwrap();
        store.set(USER_ID_KEY, "u1").await.unwrap();
        store.clear().await.unwrap();

        let reopened = FileKeyValueStore::open(path).await.unwrap();
        assert_eq!(reopened.get(USER_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_picks_up_writes_from_other_handles_on_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.toml");

        let first = FileKeyValueStore::open(path.clone()).await.unwrap();
        let second = FileKeyValueStore::open(path).await.unwrap();
        first.set(USER_ID_KEY, "u1").await.unwrap();
        second.set(SESSION_ID_KEY, "s1").await.unwrap();

        // The second handle merged the first handle's write while updating.
        assert_eq!(second.get(USER_ID_KEY).await.unwrap().as_deref(), Some("u1"));
    }
}

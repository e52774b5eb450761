use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::error::Result;

/// Volatile store used by tests and one-shot commands.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with the given pairs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SESSION_ID_KEY, USER_ID_KEY};

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get(USER_ID_KEY).await.unwrap(), None);

        store.set(USER_ID_KEY, "u1").await.unwrap();
        assert_eq!(store.get(USER_ID_KEY).await.unwrap().as_deref(), Some("u1"));

        store.remove(USER_ID_KEY).await.unwrap();
        assert_eq!(store.get(USER_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_and_shared_clones() {
        let store = InMemoryKeyValueStore::with_entries([(SESSION_ID_KEY, "s1")]);
        let clone = store.clone();
        clone.set(USER_ID_KEY, "u1").await.unwrap();
        assert_eq!(store.get(USER_ID_KEY).await.unwrap().as_deref(), Some("u1"));

        store.clear().await.unwrap();
        assert_eq!(clone.get(SESSION_ID_KEY).await.unwrap(), None);
    }
}

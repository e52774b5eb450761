//! Process-wide key-value capability.
//!
//! Stands in for browser local storage. It is injected wherever user and
//! session identifiers are read, never reached through a global.

mod memory;

pub use memory::InMemoryKeyValueStore;

use async_trait::async_trait;

use crate::error::Result;

/// Key holding the generated user id.
pub const USER_ID_KEY: &str = "userId";
/// Key holding the active session id. Shared across apps.
pub const SESSION_ID_KEY: &str = "sessionId";

/// String key-value store with explicit get/set/clear operations.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Removes every key.
    async fn clear(&self) -> Result<()>;
}

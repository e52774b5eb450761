//! Configuration service implementation.
//!
//! Loads [`ClientConfig`] from `~/.config/adkchat/config.toml`, creating the
//! file with defaults on first run, then layers environment overrides.

use std::sync::{Arc, RwLock};

use adkchat_core::config::ClientConfig;
use adkchat_core::error::Result;

use crate::paths::ChatPaths;
use crate::storage::AtomicTomlFile;

/// Loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: ChatPaths,
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    pub fn new(paths: ChatPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the configuration, reading the file on first access.
    pub fn get_config(&self) -> Result<ClientConfig> {
        if let Some(cached) = self.read_cache() {
            return Ok(cached);
        }

        let loaded = self.load()?;
        let mut write_lock = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *write_lock = Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *write_lock = None;
    }

    fn read_cache(&self) -> Option<ClientConfig> {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn load(&self) -> Result<ClientConfig> {
        let path = self.paths.config_file()?;
        let file = AtomicTomlFile::<ClientConfig>::new(path.clone());

        let from_file = match file.load()? {
            Some(config) => config,
            None => {
                let defaults = ClientConfig::default();
                file.save(&defaults)?;
                tracing::info!("[Config] Wrote default config to {}", path.display());
                defaults
            }
        };

        Ok(from_file.with_overrides(|key| std::env::var(key).ok()))
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(ChatPaths::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkchat_core::config::DEFAULT_KB_BASE_URL;
    use tempfile::TempDir;

    #[test]
    fn test_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(ChatPaths::new(Some(temp_dir.path().to_path_buf())));

        let config = service.get_config().unwrap();
        assert_eq!(config.kb_base_url, DEFAULT_KB_BASE_URL);
        assert!(temp_dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_reads_existing_file_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "workflow_poll_interval_secs = 1\ndefault_app = \"data_science\"\n",
        )
        .unwrap();
        let service = ConfigService::new(ChatPaths::new(Some(temp_dir.path().to_path_buf())));

        let config = service.get_config().unwrap();
        assert_eq!(config.workflow_poll_interval_secs, 1);
        assert_eq!(config.default_app.as_deref(), Some("data_science"));

        std::fs::write(temp_dir.path().join("config.toml"), "workflow_poll_interval_secs = 9\n")
            .unwrap();
        assert_eq!(service.get_config().unwrap().workflow_poll_interval_secs, 1);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().workflow_poll_interval_secs, 9);
    }
}

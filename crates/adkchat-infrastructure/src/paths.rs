//! Unified path management for adkchat files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/adkchat/
//! ├── config.toml     # ClientConfig
//! └── state.toml      # key-value store (userId, sessionId)
//! ```

use std::path::PathBuf;

use adkchat_core::error::{ChatError, Result};

const APP_DIR: &str = "adkchat";

/// Environment variable relocating the whole config directory.
pub const CONFIG_DIR_ENV: &str = "ADKCHAT_CONFIG_DIR";

/// Resolves adkchat paths, optionally rooted somewhere other than the
/// platform config directory (tests, portable installs).
#[derive(Debug, Clone, Default)]
pub struct ChatPaths {
    base_override: Option<PathBuf>,
}

impl ChatPaths {
    pub fn new(base_override: Option<PathBuf>) -> Self {
        Self { base_override }
    }

    /// Uses `ADKCHAT_CONFIG_DIR` when set, the platform directory otherwise.
    pub fn from_env() -> Self {
        Self::new(std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from))
    }

    /// Returns the adkchat configuration directory (e.g. `~/.config/adkchat/`).
    pub fn config_dir(&self) -> Result<PathBuf> {
        if let Some(base) = &self.base_override {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ChatError::config("Cannot find config directory"))
    }

    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn state_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("state.toml"))
    }
}

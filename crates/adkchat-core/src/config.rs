use serde::{Deserialize, Serialize};

pub const DEFAULT_AGENT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_KB_BASE_URL: &str = "http://localhost:8000/api/ddocstore";
pub const DEFAULT_AUTH_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_WORKFLOW_POLL_INTERVAL_SECS: u64 = 5;

/// Environment variable overriding [`ClientConfig::agent_base_url`].
pub const AGENT_BASE_URL_ENV: &str = "AGENT_API_BASE_URL";
/// Environment variable overriding [`ClientConfig::kb_base_url`].
pub const KB_BASE_URL_ENV: &str = "KB_API_BASE_URL";
/// Environment variable overriding [`ClientConfig::auth_base_url`].
pub const AUTH_BASE_URL_ENV: &str = "AUTH_API_BASE_URL";

/// Client configuration persisted in `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_agent_base_url")]
    pub agent_base_url: String,
    #[serde(default = "default_kb_base_url")]
    pub kb_base_url: String,
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    #[serde(default = "default_poll_interval")]
    pub workflow_poll_interval_secs: u64,
    /// App preselected instead of the first listed one.
    #[serde(default)]
    pub default_app: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agent_base_url: default_agent_base_url(),
            kb_base_url: default_kb_base_url(),
            auth_base_url: default_auth_base_url(),
            workflow_poll_interval_secs: default_poll_interval(),
            default_app: None,
        }
    }
}

impl ClientConfig {
    /// Applies overrides from a variable lookup (usually `std::env::var`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(AGENT_BASE_URL_ENV) {
            self.agent_base_url = url;
        }
        if let Some(url) = non_empty(KB_BASE_URL_ENV) {
            self.kb_base_url = url;
        }
        if let Some(url) = non_empty(AUTH_BASE_URL_ENV) {
            self.auth_base_url = url;
        }
        self
    }
}

fn default_agent_base_url() -> String {
    DEFAULT_AGENT_BASE_URL.to_string()
}

fn default_kb_base_url() -> String {
    DEFAULT_KB_BASE_URL.to_string()
}

fn default_auth_base_url() -> String {
    DEFAULT_AUTH_BASE_URL.to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_WORKFLOW_POLL_INTERVAL_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ClientConfig = toml::from_str("agent_base_url = \"http://agent:9000\"").unwrap();
        assert_eq!(config.agent_base_url, "http://agent:9000");
        assert_eq!(config.kb_base_url, DEFAULT_KB_BASE_URL);
        assert_eq!(config.workflow_poll_interval_secs, 5);
    }

    #[test]
    fn test_overrides_skip_empty_values() {
        let config = ClientConfig::default().with_overrides(|key| match key {
            AGENT_BASE_URL_ENV => Some("http://remote:8000".to_string()),
            KB_BASE_URL_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.agent_base_url, "http://remote:8000");
        assert_eq!(config.kb_base_url, DEFAULT_KB_BASE_URL);
    }
}

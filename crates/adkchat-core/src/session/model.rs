//! Backend session identity and listing entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DISPLAY_NAME_LIMIT: usize = 30;

/// Identifies the backend conversation a stream and its messages belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
}

impl SessionRef {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            app_name: app_name.into(),
            user_id: user_id.into(),
        }
    }
}

/// One row of the recent-sessions list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    /// Seconds since the epoch, fractional.
    #[serde(default)]
    pub last_update_time: Option<f64>,
    /// Derived from the first user prompt; empty when none exists.
    #[serde(default)]
    pub display_name: String,
}

impl SessionInfo {
    /// Cuts a prompt to the list title length, marking the cut with `...`.
    pub fn display_name_from(text: &str) -> String {
        let mut chars = text.chars();
        let head: String = chars.by_ref().take(DISPLAY_NAME_LIMIT).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let seconds = self.last_update_time?;
        DateTime::from_timestamp_millis((seconds * 1000.0) as i64)
    }

    /// Title for list views, falling back to a shortened id.
    pub fn title(&self) -> String {
        if self.display_name.is_empty() {
            let short: String = self.id.chars().take(8).collect();
            format!("Session {}", short)
        } else {
            self.display_name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_truncates() {
        let long = "a".repeat(31);
        assert_eq!(SessionInfo::display_name_from(&long), format!("{}...", "a".repeat(30)));
        let exact = "b".repeat(30);
        assert_eq!(SessionInfo::display_name_from(&exact), exact);
        assert_eq!(SessionInfo::display_name_from("short"), "short");
    }

    #[test]
    fn test_last_updated() {
        let info = SessionInfo {
            id: "s_1".into(),
            app_name: "app".into(),
            user_id: "u".into(),
            last_update_time: Some(1_749_706_898.074),
            display_name: String::new(),
        };
        let ts = info.last_updated().unwrap();
        assert_eq!(ts.timestamp(), 1_749_706_898);
        assert_eq!(info.title(), "Session s_1");
    }
}

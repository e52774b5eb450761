use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A file the user attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// MIME type, e.g. `image/png`
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    /// Base64 encoded content
    pub content: String,
}

/// A single message in the chat surface.
///
/// `id` is stable once assigned and is the join key for artifact updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    /// Fetched images as data URIs, in settle order.
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Function names seen while building this message, first-seen order.
    #[serde(default)]
    pub processed_function_calls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Artifact names of historical messages, resolved after loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_filenames: Option<Vec<String>>,
}

impl Message {
    fn with_role(id: String, role: MessageRole, content: String) -> Self {
        Self {
            id,
            role,
            content,
            invocation_id: None,
            image_urls: Vec::new(),
            processed_function_calls: Vec::new(),
            attachments: None,
            artifact_filenames: None,
        }
    }

    /// The echo of a submitted prompt, keyed by the frontend invocation id.
    pub fn user(frontend_invocation_id: &str, content: impl Into<String>) -> Self {
        let mut message = Self::with_role(
            format!("user_{}", frontend_invocation_id),
            MessageRole::User,
            content.into(),
        );
        message.invocation_id = Some(frontend_invocation_id.to_string());
        message
    }

    /// A fresh assistant message opened by the stream assembler.
    pub fn assistant(backend_invocation_id: Option<&str>, content: impl Into<String>) -> Self {
        let tag = backend_invocation_id.unwrap_or("null");
        let mut message = Self::with_role(
            format!("assistant_{}_{}", tag, Uuid::new_v4()),
            MessageRole::Assistant,
            content.into(),
        );
        message.invocation_id = backend_invocation_id.map(String::from);
        message
    }

    /// A synthetic assistant message carrying an error for the user.
    pub fn assistant_notice(content: impl Into<String>) -> Self {
        Self::with_role(
            Uuid::new_v4().to_string(),
            MessageRole::Assistant,
            content.into(),
        )
    }

    /// A message rebuilt from session history.
    pub fn historical(id: Option<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self::with_role(
            id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            role,
            content.into(),
        )
    }

    /// Merges function names, skipping ones already recorded.
    pub fn merge_function_calls<'a>(&mut self, names: impl IntoIterator<Item = &'a String>) {
        for name in names {
            if !self.processed_function_calls.contains(name) {
                self.processed_function_calls.push(name.clone());
            }
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_id() {
        let message = Message::user("abc", "hi");
        assert_eq!(message.id, "user_abc");
        assert_eq!(message.invocation_id.as_deref(), Some("abc"));
        assert_eq!(message.role, MessageRole::User);
    }

    #[test]
    fn test_assistant_message_id_embeds_backend_id() {
        let message = Message::assistant(Some("inv-1"), "hello");
        assert!(message.id.starts_with("assistant_inv-1_"));
        assert!(message.image_urls.is_empty());
    }

    #[test]
    fn test_merge_function_calls_dedups_in_order() {
        let mut message = Message::assistant(Some("i"), "");
        let first = vec!["search".to_string(), "plot".to_string()];
        let second = vec!["plot".to_string(), "sql".to_string()];
        message.merge_function_calls(&first);
        message.merge_function_calls(&second);
        assert_eq!(message.processed_function_calls, vec!["search", "plot", "sql"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let message = Message::user("x", "hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("imageUrls").is_some());
        assert!(json.get("processedFunctionCalls").is_some());
    }
}

//! Error types for the ADKChat client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures while resolving the user's backend session.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    /// A new session was needed but no application was selected.
    #[error("no app name available to create a new session")]
    MissingAppName,

    /// The backend rejected (or never answered) the session creation call.
    #[error("backend session creation failed for session {session_id}")]
    BackendCreationFailed { session_id: String },
}

/// A shared error type for the entire ADKChat client.
///
/// Every failure in the streaming core degrades to one of these variants;
/// none of them is fatal to the process.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ChatError {
    /// Network-level failure (connect, reset, body read)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The operation was aborted on purpose. Never surfaced to the user.
    #[error("Cancelled: {reason}")]
    Cancelled { reason: String },

    /// Backend answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Malformed frame, payload or unexpected field shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Session bootstrap failure
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication rejected by the user service
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Deliberate aborts are silent; callers use this to skip error surfacing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. }) || self.http_status() == Some(404)
    }

    /// Returns the HTTP status for backend-reported failures.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short text suitable for an inline chat message or a notice.
    ///
    /// For HTTP failures this prefers the `detail` or `message` field of a
    /// JSON body, falling back to the raw body.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|value| {
                        ["detail", "message", "error"]
                            .iter()
                            .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(String::from))
                    })
                    .unwrap_or_else(|| body.clone());
                format!("{} ({})", detail, status)
            }
            Self::Session(inner) => inner.to_string(),
            Self::Transport { message } => message.clone(),
            Self::Auth(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ChatError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;

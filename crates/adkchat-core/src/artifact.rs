//! Image artifacts produced by the backend during an invocation.

use serde::{Deserialize, Serialize};

use crate::session::SessionRef;

/// A pending fetch for one image artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub filename: String,
    pub session: SessionRef,
}

impl ArtifactRef {
    pub fn new(filename: impl Into<String>, session: SessionRef) -> Self {
        Self {
            filename: filename.into(),
            session,
        }
    }
}

/// `inlineData` of an artifact response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPayload {
    /// URL-safe base64
    pub data: String,
    pub mime_type: String,
}

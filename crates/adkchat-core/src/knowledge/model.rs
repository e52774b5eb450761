//! Knowledge-base document records.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a knowledge-base file.
///
/// Local states (`Uploading`, `*Error`) are set by the client; `Pending`,
/// `Running`, `Success` and `Error` come from the workflow service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KbFileStatus {
    Uploading,
    Processing,
    Deleting,
    ReEmbedding,
    Pending,
    Running,
    Success,
    Error,
    UploadError,
    DeleteError,
    ReEmbedError,
    Other(String),
}

impl KbFileStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uploading => "UPLOADING",
            Self::Processing => "PROCESSING",
            Self::Deleting => "DELETING",
            Self::ReEmbedding => "RE_EMBEDDING",
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::UploadError => "UPLOAD_ERROR",
            Self::DeleteError => "DELETE_ERROR",
            Self::ReEmbedError => "RE_EMBED_ERROR",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Statuses that start a workflow poll.
    pub fn starts_polling(&self) -> bool {
        matches!(self, Self::Processing | Self::Deleting | Self::ReEmbedding)
    }

    /// Statuses during which file actions are disabled.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Uploading | Self::Processing | Self::Deleting | Self::ReEmbedding
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Error | Self::UploadError | Self::DeleteError | Self::ReEmbedError
        )
    }
}

impl From<String> for KbFileStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "UPLOADING" => Self::Uploading,
            "PROCESSING" => Self::Processing,
            "DELETING" => Self::Deleting,
            "RE_EMBEDDING" => Self::ReEmbedding,
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUCCESS" => Self::Success,
            "ERROR" => Self::Error,
            "UPLOAD_ERROR" => Self::UploadError,
            "DELETE_ERROR" => Self::DeleteError,
            "RE_EMBED_ERROR" => Self::ReEmbedError,
            _ => Self::Other(value),
        }
    }
}

impl From<KbFileStatus> for String {
    fn from(value: KbFileStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for KbFileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document tracked by the knowledge-base manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbFile {
    #[serde(rename = "doc_uuid")]
    pub doc_uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(rename = "workflow_id", default)]
    pub workflow_id: Option<String>,
    pub status: KbFileStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Body of `GET /workflows/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub status: KbFileStatus,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_strings() {
        let status: KbFileStatus = serde_json::from_str("\"RE_EMBEDDING\"").unwrap();
        assert_eq!(status, KbFileStatus::ReEmbedding);
        assert!(status.starts_polling());

        let unknown: KbFileStatus = serde_json::from_str("\"QUEUED\"").unwrap();
        assert_eq!(unknown, KbFileStatus::Other("QUEUED".into()));
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"QUEUED\"");
    }

    #[test]
    fn test_kb_file_field_names() {
        let file = KbFile {
            doc_uuid: "d1".into(),
            name: "a.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 10,
            last_modified: None,
            workflow_id: Some("w1".into()),
            status: KbFileStatus::Processing,
            error_message: None,
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["doc_uuid"], "d1");
        assert_eq!(json["workflow_id"], "w1");
        assert_eq!(json["type"], "application/pdf");
        assert_eq!(json["status"], "PROCESSING");
    }
}

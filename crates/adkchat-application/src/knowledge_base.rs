//! Knowledge-base file list and workflow tracking.

use std::sync::Arc;
use std::time::Duration;

use adkchat_core::error::{ChatError, Result};
use adkchat_core::knowledge::{KbFile, KbFileStatus, WorkflowStatus};
use adkchat_interaction::KnowledgeBaseClient;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Error text recorded when a poll returns a status outside the known set.
pub const UNEXPECTED_POLL_STATUS: &str = "Unexpected status from polling";

fn in_workflow(file: &KbFile, workflow_id: &str) -> bool {
    file.workflow_id.as_deref() == Some(workflow_id)
}

/// Whether a workflow needs another poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Continue,
    Stop,
}

/// Applies one workflow status response to the files tracked under `workflow_id`.
pub fn apply_workflow_status(
    files: &mut Vec<KbFile>,
    workflow_id: &str,
    response: &WorkflowStatus,
) -> PollDecision {
    match &response.status {
        KbFileStatus::Success => {
            files.retain(|f| !(in_workflow(f, workflow_id) && f.status == KbFileStatus::Deleting));
            for file in files.iter_mut().filter(|f| in_workflow(f, workflow_id)) {
                file.status = KbFileStatus::Success;
                file.error_message = None;
            }
            PollDecision::Stop
        }
        KbFileStatus::Error => {
            for file in files.iter_mut().filter(|f| in_workflow(f, workflow_id)) {
                file.status = KbFileStatus::Error;
                file.error_message = response.error.clone();
            }
            PollDecision::Stop
        }
        status @ (KbFileStatus::Pending | KbFileStatus::Running) => {
            for file in files.iter_mut().filter(|f| in_workflow(f, workflow_id)) {
                if file.status != *status {
                    file.status = status.clone();
                    file.error_message = None;
                }
            }
            PollDecision::Continue
        }
        other => {
            tracing::warn!(
                "[KB] Workflow {} has unexpected status {}; stopping poll",
                workflow_id,
                other
            );
            for file in files.iter_mut().filter(|f| in_workflow(f, workflow_id)) {
                file.status = other.clone();
                file.error_message = Some(UNEXPECTED_POLL_STATUS.to_string());
            }
            PollDecision::Stop
        }
    }
}

/// Marks the workflow's files as failed after a status request error.
pub fn apply_poll_failure(files: &mut [KbFile], workflow_id: &str, message: &str) {
    for file in files.iter_mut().filter(|f| in_workflow(f, workflow_id)) {
        file.status = KbFileStatus::Error;
        file.error_message = Some(format!("Polling failed: {}", message));
    }
}

/// Tracks knowledge-base documents through upload, delete and re-embed workflows.
#[derive(Clone)]
pub struct KnowledgeBase {
    client: Arc<KnowledgeBaseClient>,
    files: Arc<Mutex<Vec<KbFile>>>,
    poll_interval: Duration,
}

impl KnowledgeBase {
    pub fn new(client: Arc<KnowledgeBaseClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            files: Arc::new(Mutex::new(Vec::new())),
            poll_interval,
        }
    }

    pub async fn files(&self) -> Vec<KbFile> {
        self.files.lock().await.clone()
    }

    pub async fn find(&self, doc_uuid: &str) -> Option<KbFile> {
        self.files.lock().await.iter().find(|f| f.doc_uuid == doc_uuid).cloned()
    }

    /// Adds a document known from elsewhere, e.g. one named on the command line.
    pub async fn track(&self, file: KbFile) {
        self.files.lock().await.push(file);
    }

    /// Workflows whose files are in a polling state.
    pub async fn active_workflows(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for file in self.files.lock().await.iter() {
            if let Some(id) = &file.workflow_id {
                if file.status.starts_polling() && !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    /// Uploads a file. The entry is listed as `UPLOADING` under a temporary
    /// id, then becomes `PROCESSING` or `UPLOAD_ERROR`.
    pub async fn upload(&self, name: &str, bytes: Vec<u8>, mime_type: &str) -> Result<KbFile> {
        let temp_id = Uuid::new_v4().to_string();
        self.track(KbFile {
            doc_uuid: temp_id.clone(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            last_modified: Some(Utc::now().to_rfc3339()),
            workflow_id: None,
            status: KbFileStatus::Uploading,
            error_message: None,
        })
        .await;

        let result = self.client.upload(name, bytes, mime_type).await;
        let mut files = self.files.lock().await;
        let entry = files
            .iter_mut()
            .find(|f| f.doc_uuid == temp_id)
            .ok_or_else(|| ChatError::not_found("kb file", temp_id.clone()))?;

        match result {
            Ok(accepted) => {
                entry.doc_uuid = accepted.doc_uuid;
                entry.workflow_id = Some(accepted.workflow_id);
                entry.status = KbFileStatus::Processing;
                tracing::info!(
                    "[KB] Upload started for {} (workflow {:?})",
                    entry.name,
                    entry.workflow_id
                );
                Ok(entry.clone())
            }
            Err(e) => {
                tracing::error!("[KB] Upload failed for {}: {}", name, e);
                entry.status = KbFileStatus::UploadError;
                entry.error_message = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Starts deletion of a tracked document.
    pub async fn delete(&self, doc_uuid: &str) -> Result<String> {
        self.require(doc_uuid).await?;
        let result = self.client.delete(doc_uuid).await;
        self.settle_start(
            doc_uuid,
            result.map(|w| w.workflow_id),
            KbFileStatus::Deleting,
            KbFileStatus::DeleteError,
        )
        .await
    }

    /// Starts re-embedding of a tracked document.
    pub async fn re_embed(&self, doc_uuid: &str, version_override: Option<&str>) -> Result<String> {
        self.require(doc_uuid).await?;
        let result = self.client.re_embed(doc_uuid, version_override).await;
        self.settle_start(
            doc_uuid,
            result.map(|w| w.workflow_id),
            KbFileStatus::ReEmbedding,
            KbFileStatus::ReEmbedError,
        )
        .await
    }

    async fn require(&self, doc_uuid: &str) -> Result<()> {
        if self.find(doc_uuid).await.is_none() {
            tracing::error!("[KB] File {} not found", doc_uuid);
            return Err(ChatError::not_found("kb file", doc_uuid));
        }
        Ok(())
    }

    async fn settle_start(
        &self,
        doc_uuid: &str,
        result: Result<String>,
        started: KbFileStatus,
        failed: KbFileStatus,
    ) -> Result<String> {
        let mut files = self.files.lock().await;
        let entry = files
            .iter_mut()
            .find(|f| f.doc_uuid == doc_uuid)
            .ok_or_else(|| ChatError::not_found("kb file", doc_uuid))?;

        match result {
            Ok(workflow_id) => {
                tracing::info!("[KB] {} started for {} (workflow {})", started, entry.name, workflow_id);
                entry.status = started;
                entry.workflow_id = Some(workflow_id.clone());
                entry.error_message = None;
                Ok(workflow_id)
            }
            Err(e) => {
                tracing::error!("[KB] Could not start {} for {}: {}", started, entry.name, e);
                entry.status = failed;
                entry.error_message = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Queries the workflow once and applies the result.
    pub async fn poll_once(&self, workflow_id: &str) -> PollDecision {
        let response = self.client.workflow_status(workflow_id).await;
        let mut files = self.files.lock().await;

        if !files.iter().any(|f| in_workflow(f, workflow_id)) {
            tracing::debug!("[KB] Workflow {} no longer tracked; stopping poll", workflow_id);
            return PollDecision::Stop;
        }

        match response {
            Ok(status) => {
                tracing::debug!("[KB] Workflow {} status {}", workflow_id, status.status);
                apply_workflow_status(&mut files, workflow_id, &status)
            }
            Err(e) => {
                tracing::error!("[KB] Error checking status for workflow {}: {}", workflow_id, e);
                apply_poll_failure(&mut files, workflow_id, &e.user_message());
                PollDecision::Stop
            }
        }
    }

    /// Polls a workflow every interval until it settles or `cancel` fires.
    pub async fn watch(&self, workflow_id: &str, cancel: CancellationToken) {
        tracing::info!("[KB] Starting polling for workflow {}", workflow_id);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("[KB] Polling for workflow {} cancelled", workflow_id);
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            if self.poll_once(workflow_id).await == PollDecision::Stop {
                tracing::info!("[KB] Stopped polling for workflow {}", workflow_id);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(uuid: &str, workflow: &str, status: KbFileStatus) -> KbFile {
        KbFile {
            doc_uuid: uuid.into(),
            name: format!("{}.pdf", uuid),
            mime_type: "application/pdf".into(),
            size: 10,
            last_modified: None,
            workflow_id: Some(workflow.into()),
            status,
            error_message: None,
        }
    }

    fn status(status: &str, error: Option<&str>) -> WorkflowStatus {
        WorkflowStatus {
            status: KbFileStatus::from(status.to_string()),
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_success_removes_deleting_file() {
        let mut files = vec![
            file("a", "w1", KbFileStatus::Deleting),
            file("b", "w2", KbFileStatus::Processing),
        ];
        assert_eq!(
            apply_workflow_status(&mut files, "w1", &status("SUCCESS", None)),
            PollDecision::Stop
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].doc_uuid, "b");
    }

    #[test]
    fn test_success_marks_processing_file() {
        let mut files = vec![file("a", "w1", KbFileStatus::ReEmbedding)];
        apply_workflow_status(&mut files, "w1", &status("SUCCESS", None));
        assert_eq!(files[0].status, KbFileStatus::Success);
    }

    #[test]
    fn test_error_records_backend_text() {
        let mut files = vec![file("a", "w1", KbFileStatus::Processing)];
        apply_workflow_status(&mut files, "w1", &status("ERROR", Some("bad pdf")));
        assert_eq!(files[0].status, KbFileStatus::Error);
        assert_eq!(files[0].error_message.as_deref(), Some("bad pdf"));
    }

    #[test]
    fn test_running_continues() {
        let mut files = vec![file("a", "w1", KbFileStatus::Processing)];
        assert_eq!(
            apply_workflow_status(&mut files, "w1", &status("RUNNING", None)),
            PollDecision::Continue
        );
        assert_eq!(files[0].status, KbFileStatus::Running);
    }

    #[test]
    fn test_unknown_status_stops_with_message() {
        let mut files = vec![file("a", "w1", KbFileStatus::Processing)];
        assert_eq!(
            apply_workflow_status(&mut files, "w1", &status("PAUSED", None)),
            PollDecision::Stop
        );
        assert_eq!(files[0].status, KbFileStatus::Other("PAUSED".into()));
        assert_eq!(files[0].error_message.as_deref(), Some(UNEXPECTED_POLL_STATUS));
    }

    #[test]
    fn test_poll_failure() {
        let mut files = vec![file("a", "w1", KbFileStatus::Processing)];
        apply_poll_failure(&mut files, "w1", "connection refused");
        assert_eq!(files[0].status, KbFileStatus::Error);
        assert_eq!(
            files[0].error_message.as_deref(),
            Some("Polling failed: connection refused")
        );
    }
}

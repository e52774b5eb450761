//! Knowledge-base document API (`/api/ddocstore`).

use adkchat_core::error::Result;
use adkchat_core::knowledge::WorkflowStatus;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http::{encode_segment, join_url, json_or_error, transport_error};

/// Answer to an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAccepted {
    pub doc_uuid: String,
    pub workflow_id: String,
}

/// Answer to an accepted delete or re-embed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStarted {
    pub workflow_id: String,
}

#[derive(Clone, Debug)]
pub struct KnowledgeBaseClient {
    client: Client,
    base_url: String,
}

impl KnowledgeBaseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Uploads one document as the multipart field `file`.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>, mime_type: &str) -> Result<UploadAccepted> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(transport_error)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(join_url(&self.base_url, "upload/"))
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        json_or_error(response).await
    }

    pub async fn delete(&self, doc_uuid: &str) -> Result<WorkflowStarted> {
        let response = self
            .client
            .delete(join_url(&self.base_url, &format!("documents/{}", encode_segment(doc_uuid))))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        json_or_error(response).await
    }

    /// Starts re-embedding, optionally pinning the embedder version.
    pub async fn re_embed(&self, doc_uuid: &str, version_override: Option<&str>) -> Result<WorkflowStarted> {
        let url = join_url(
            &self.base_url,
            &format!("documents/{}/re-embed", encode_segment(doc_uuid)),
        );
        let mut request = self.client.post(url).header(ACCEPT, "application/json");
        if let Some(version) = version_override {
            request = request.query(&[("new_embedder_version_override", version)]);
        }
        let response = request.send().await.map_err(transport_error)?;
        json_or_error(response).await
    }

    pub async fn workflow_status(&self, workflow_id: &str) -> Result<WorkflowStatus> {
        let response = self
            .client
            .get(join_url(
                &self.base_url,
                &format!("workflows/{}/status", encode_segment(workflow_id)),
            ))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        json_or_error(response).await
    }
}

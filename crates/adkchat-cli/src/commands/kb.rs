use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;

use adkchat_application::KnowledgeBase;
use adkchat_core::knowledge::{KbFile, KbFileStatus};
use adkchat_interaction::KnowledgeBaseClient;

use super::{Output, user_facing};

pub struct KbCommand {
    client: Arc<KnowledgeBaseClient>,
    kb: KnowledgeBase,
    output: Output,
}

/// Entry for a document this process did not upload itself.
fn known_document(doc_uuid: &str, workflow_id: Option<&str>, status: KbFileStatus) -> KbFile {
    KbFile {
        doc_uuid: doc_uuid.to_string(),
        name: doc_uuid.to_string(),
        mime_type: String::new(),
        size: 0,
        last_modified: None,
        workflow_id: workflow_id.map(String::from),
        status,
        error_message: None,
    }
}

impl KbCommand {
    pub fn new(base_url: &str, poll_interval: Duration, output: Output) -> Self {
        let client = Arc::new(KnowledgeBaseClient::new(base_url));
        Self {
            kb: KnowledgeBase::new(client.clone(), poll_interval),
            client,
            output,
        }
    }

    pub async fn upload(&self, path: &Path, watch: bool) -> Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Path has no file name")?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let file = self
            .kb
            .upload(name, bytes, mime.as_ref())
            .await
            .map_err(user_facing)?;
        self.print_file(&file)?;

        match (&file.workflow_id, watch) {
            (Some(workflow_id), true) => self.follow(workflow_id, &file.doc_uuid).await,
            _ => Ok(()),
        }
    }

    pub async fn delete(&self, doc_uuid: &str, watch: bool) -> Result<()> {
        self.kb
            .track(known_document(doc_uuid, None, KbFileStatus::Success))
            .await;
        let workflow_id = self.kb.delete(doc_uuid).await.map_err(user_facing)?;
        println!("Delete started for {} (workflow {})", doc_uuid, workflow_id);

        if watch {
            self.follow(&workflow_id, doc_uuid).await?;
        }
        Ok(())
    }

    pub async fn re_embed(&self, doc_uuid: &str, version_override: Option<&str>, watch: bool) -> Result<()> {
        self.kb
            .track(known_document(doc_uuid, None, KbFileStatus::Success))
            .await;
        let workflow_id = self
            .kb
            .re_embed(doc_uuid, version_override)
            .await
            .map_err(user_facing)?;
        println!("Re-embed started for {} (workflow {})", doc_uuid, workflow_id);

        if watch {
            self.follow(&workflow_id, doc_uuid).await?;
        }
        Ok(())
    }

    pub async fn status(&self, workflow_id: &str) -> Result<()> {
        let status = self
            .client
            .workflow_status(workflow_id)
            .await
            .map_err(user_facing)?;
        self.output.emit(&status, || match &status.error {
            Some(error) => println!("{}: {}", status.status, error),
            None => println!("{}", status.status),
        })
    }

    pub async fn watch(&self, workflow_id: &str) -> Result<()> {
        self.kb
            .track(known_document(workflow_id, Some(workflow_id), KbFileStatus::Processing))
            .await;
        self.follow(workflow_id, workflow_id).await
    }

    /// Polls until the workflow settles or Ctrl-C, then reports the document.
    async fn follow(&self, workflow_id: &str, doc_uuid: &str) -> Result<()> {
        let token = CancellationToken::new();
        let on_interrupt = token.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        self.kb.watch(workflow_id, token.clone()).await;
        interrupt.abort();

        let Some(file) = self.kb.find(doc_uuid).await else {
            println!("{} deleted", doc_uuid);
            return Ok(());
        };
        if token.is_cancelled() {
            println!("Stopped watching workflow {} ({})", workflow_id, file.status);
            return Ok(());
        }

        self.print_file(&file)?;
        if file.status.is_error() {
            bail!(
                "Workflow {} failed: {}",
                workflow_id,
                file.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }

    fn print_file(&self, file: &KbFile) -> Result<()> {
        self.output.emit(file, || {
            let workflow = file.workflow_id.as_deref().unwrap_or("-");
            match &file.error_message {
                Some(error) => println!(
                    "{}  {}  {}  workflow {}  {}",
                    file.doc_uuid, file.name, file.status, workflow, error
                ),
                None => println!(
                    "{}  {}  {}  workflow {}",
                    file.doc_uuid, file.name, file.status, workflow
                ),
            }
        })
    }
}

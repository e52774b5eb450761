//! Loads a past session into chat messages, images included.
//!
//! Text comes first; images are joined into the message store by message id
//! as each fetch settles, so a slow artifact never holds back the transcript.

use std::sync::Arc;

use adkchat_core::error::Result;
use adkchat_core::message::Message;
use adkchat_core::session::SessionRef;
use adkchat_interaction::AgentApiClient;
use adkchat_interaction::artifact::data_uri;
use futures::future::join_all;

use crate::message_store::MessageStore;

#[derive(Clone)]
pub struct HistoryLoader {
    client: Arc<AgentApiClient>,
}

impl HistoryLoader {
    pub fn new(client: Arc<AgentApiClient>) -> Self {
        Self { client }
    }

    /// Fetches the session's messages without their images.
    pub async fn load(&self, session: &SessionRef) -> Result<Vec<Message>> {
        let messages = self.client.session_messages(session).await?;
        tracing::info!(
            "[Session] Loaded {} messages for session {}",
            messages.len(),
            session.id
        );
        Ok(messages)
    }

    /// Fetches every artifact named by `messages` and appends each image to
    /// its message in `store` as soon as it arrives.
    ///
    /// All fetches run concurrently. A failed fetch is logged and leaves the
    /// message without that image. Returns the number of images attached.
    pub async fn attach_images(
        &self,
        session: &SessionRef,
        messages: &[Message],
        store: &MessageStore,
    ) -> usize {
        let fetches = messages.iter().flat_map(|message| {
            message
                .artifact_filenames
                .iter()
                .flatten()
                .map(move |filename| (message.id.as_str(), filename.as_str()))
        });

        let attached = join_all(fetches.map(|(message_id, filename)| async move {
            match self.client.fetch_artifact(session, filename).await {
                Ok(payload) => store.append_image(message_id, data_uri(&payload)).await,
                Err(e) => {
                    tracing::warn!(
                        "[Artifact] Could not load historical image {} for session {}: {}",
                        filename,
                        session.id,
                        e
                    );
                    false
                }
            }
        }))
        .await;

        let loaded = attached.into_iter().filter(|ok| *ok).count();
        tracing::info!(
            "[Artifact] Attached {} historical images for session {}",
            loaded,
            session.id
        );
        loaded
    }
}

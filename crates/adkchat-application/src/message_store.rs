//! Shared message list for the chat surface.

use std::sync::Arc;

use adkchat_core::event::AgentEvent;
use adkchat_core::message::Message;
use tokio::sync::{Mutex, watch};

use crate::assembler::{MessageAssembler, Outcome};

/// Ordered message list behind a single lock.
///
/// Every mutation, whether from the stream, an artifact fetch, or a user
/// action, goes through this store and is keyed by message id, so updates
/// from concurrent tasks never overwrite each other. Each change bumps a
/// revision counter that observers can `subscribe` to.
#[derive(Clone)]
pub struct MessageStore {
    messages: Arc<Mutex<Vec<Message>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl MessageStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            revision: Arc::new(revision),
        }
    }

    /// Receiver that changes whenever the list does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<Message> {
        self.messages.lock().await.iter().find(|m| m.id == id).cloned()
    }

    pub async fn push(&self, message: Message) {
        self.messages.lock().await.push(message);
        self.bump();
    }

    pub async fn replace_all(&self, messages: Vec<Message>) {
        *self.messages.lock().await = messages;
        self.bump();
    }

    pub async fn clear(&self) {
        self.messages.lock().await.clear();
        self.bump();
    }

    /// Runs one stream event through the assembler under the list lock.
    pub async fn apply_event(&self, assembler: &mut MessageAssembler, event: &AgentEvent) -> Outcome {
        let outcome = {
            let mut messages = self.messages.lock().await;
            assembler.handle(event, &mut messages)
        };
        if matches!(outcome, Outcome::Applied { .. }) {
            self.bump();
        }
        outcome
    }

    /// Appends an image to a message. Returns `false` if the id is gone.
    pub async fn append_image(&self, id: &str, data_uri: String) -> bool {
        self.update(id, |message| message.image_urls.push(data_uri)).await
    }

    /// Appends text to a message. Returns `false` if the id is gone.
    pub async fn append_content(&self, id: &str, text: &str) -> bool {
        self.update(id, |message| message.content.push_str(text)).await
    }

    async fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        let found = {
            let mut messages = self.messages.lock().await;
            match messages.iter_mut().find(|m| m.id == id) {
                Some(message) => {
                    f(message);
                    true
                }
                None => false,
            }
        };
        if found {
            self.bump();
        } else {
            tracing::debug!("[Assembler] Message {} no longer in the list; update dropped", id);
        }
        found
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkchat_core::event::{EventPart, StreamInvocation};

    fn text_event(text: &str) -> AgentEvent {
        AgentEvent {
            invocation_id: Some("i1".into()),
            parts: vec![EventPart::Text { text: text.into() }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_apply_event_and_targeted_updates() {
        let store = MessageStore::new();
        let mut assembler = MessageAssembler::new(StreamInvocation::with_frontend_id("f"));
        store.push(Message::user("f", "hi")).await;

        let Outcome::Applied { message_id, .. } = store.apply_event(&mut assembler, &text_event("Hello")).await
        else {
            panic!("expected applied");
        };

        assert!(store.append_image(&message_id, "data:image/png;base64,AA==".into()).await);
        assert!(store.append_content(&message_id, "\n[note]").await);

        let message = store.get(&message_id).await.unwrap();
        assert_eq!(message.content, "Hello\n[note]");
        assert_eq!(message.image_urls.len(), 1);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_of_missing_id_is_dropped() {
        let store = MessageStore::new();
        assert!(!store.append_content("gone", "x").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let store = MessageStore::new();
        let message = Message::assistant(Some("i1"), "");
        let id = message.id.clone();
        store.push(message).await;

        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move { store.append_image(&id, format!("img{}", n)).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(store.get(&id).await.unwrap().image_urls.len(), 16);
    }

    #[tokio::test]
    async fn test_subscribers_see_revisions() {
        let store = MessageStore::new();
        let mut rx = store.subscribe();
        store.push(Message::user("f", "hi")).await;
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();
        store.clear().await;
        assert!(rx.has_changed().unwrap());
    }
}

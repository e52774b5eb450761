use std::sync::Arc;

use anyhow::{Result, bail};

use adkchat_application::{HistoryLoader, MessageStore, SessionManager};
use adkchat_core::session::SessionRef;
use adkchat_core::store::KeyValueStore;
use adkchat_infrastructure::FileKeyValueStore;
use adkchat_interaction::AgentApiClient;

use super::{Output, user_facing};

/// Backend and app a sessions command runs against.
pub struct Target {
    pub base_url: String,
    pub app: Option<String>,
}

struct Resolved {
    client: Arc<AgentApiClient>,
    app: String,
    user_id: String,
}

/// Uses the same local user id as the chat client, so its sessions are visible.
async fn resolve(target: &Target) -> Result<Resolved> {
    let client = Arc::new(AgentApiClient::new(target.base_url.clone()));
    let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open_default().await?);
    let sessions = SessionManager::new(store, client.clone());

    let app = match &target.app {
        Some(app) => app.clone(),
        None => match client.list_apps().await.map_err(user_facing)?.into_iter().next() {
            Some(app) => app,
            None => bail!("No apps available; pass --app"),
        },
    };
    let user_id = sessions.user_id().await.map_err(user_facing)?;

    Ok(Resolved {
        client,
        app,
        user_id,
    })
}

pub async fn list(target: &Target, output: &Output) -> Result<()> {
    let resolved = resolve(target).await?;
    let sessions = resolved
        .client
        .list_sessions(&resolved.app, &resolved.user_id)
        .await
        .map_err(user_facing)?;

    output.emit(&sessions, || {
        if sessions.is_empty() {
            println!("No sessions for {}.", resolved.app);
        }
        for info in &sessions {
            let updated = info
                .last_updated()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{}  {}  {}", info.id, updated, info.title());
        }
    })
}

pub async fn history(target: &Target, session_id: &str, output: &Output) -> Result<()> {
    let resolved = resolve(target).await?;
    let session = SessionRef::new(resolved.app, resolved.user_id, session_id);
    let loader = HistoryLoader::new(resolved.client);
    let text = loader.load(&session).await.map_err(user_facing)?;

    // One-shot print: wait for every image before output.
    let store = MessageStore::new();
    store.replace_all(text.clone()).await;
    loader.attach_images(&session, &text, &store).await;
    let messages = store.snapshot().await;

    output.emit(&messages, || {
        for message in &messages {
            println!("[{:?}] {}", message.role, message.content);
            if !message.image_urls.is_empty() {
                println!("  ({} image(s))", message.image_urls.len());
            }
        }
    })
}

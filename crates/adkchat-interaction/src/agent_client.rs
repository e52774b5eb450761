//! AgentApiClient - REST and SSE access to the agent backend.
//!
//! Covers the streaming run endpoint plus the session, history, artifact
//! and app-list calls the chat surface needs around it.

use adkchat_core::artifact::ArtifactPayload;
use adkchat_core::error::{ChatError, Result};
use adkchat_core::event::AgentEvent;
use adkchat_core::message::{Message, MessageRole};
use adkchat_core::session::{SessionBackend, SessionInfo, SessionRef};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::history_artifact_filenames;
use crate::classifier::classify_value;
use crate::http::{encode_segment, error_from_response, join_url, json_or_error, transport_error};

const EVENT_STREAM: &str = "text/event-stream";
const APPLICATION_JSON: &str = "application/json";

/// Body of `POST /run_sse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSseRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: NewMessage,
    pub streaming: bool,
    pub invocation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: String,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

impl RunSseRequest {
    pub fn new(session: &SessionRef, text: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        Self {
            app_name: session.app_name.clone(),
            user_id: session.user_id.clone(),
            session_id: session.id.clone(),
            new_message: NewMessage {
                role: "user".to_string(),
                parts: vec![TextPart { text: text.into() }],
            },
            streaming: true,
            invocation_id: invocation_id.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactEnvelope {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: Option<String>,
    mime_type: Option<String>,
}

/// Client for one agent backend base URL.
#[derive(Clone, Debug)]
pub struct AgentApiClient {
    client: Client,
    base_url: String,
}

impl AgentApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sessions_url(&self, app_name: &str, user_id: &str) -> String {
        join_url(
            &self.base_url,
            &format!(
                "apps/{}/users/{}/sessions",
                encode_segment(app_name),
                encode_segment(user_id)
            ),
        )
    }

    fn session_url(&self, session: &SessionRef) -> String {
        format!(
            "{}/{}",
            self.sessions_url(&session.app_name, &session.user_id),
            encode_segment(&session.id)
        )
    }

    /// Address of one artifact; `filename` must already be quote-stripped.
    pub fn artifact_url(&self, session: &SessionRef, filename: &str) -> String {
        format!(
            "{}/artifacts/{}",
            self.session_url(session),
            encode_segment(filename)
        )
    }

    /// Opens the SSE stream.
    ///
    /// Only transport failures are errors here. The caller inspects the
    /// status, because a non-2xx answer is reported as a chat message.
    pub async fn run_sse(&self, request: &RunSseRequest) -> Result<Response> {
        let url = join_url(&self.base_url, "run_sse");
        tracing::debug!(
            "[API] POST {} (invocation {})",
            url,
            request.invocation_id
        );
        self.client
            .post(url)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, EVENT_STREAM)
            .json(request)
            .send()
            .await
            .map_err(transport_error)
    }

    /// `GET /list-apps`.
    pub async fn list_apps(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(join_url(&self.base_url, "list-apps"))
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(transport_error)?;
        json_or_error(response).await
    }

    /// Lists a user's sessions, most recently updated first.
    pub async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<SessionInfo>> {
        let url = self.sessions_url(app_name, user_id);
        tracing::info!("[API] Fetching user sessions from: {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(transport_error)?;
        let data: Value = json_or_error(response).await?;

        let Value::Array(entries) = data else {
            tracing::warn!("[API] list_sessions: response is not an array");
            return Ok(Vec::new());
        };

        let mut sessions: Vec<SessionInfo> = entries.iter().map(session_info_from).collect();
        sessions.sort_by(|a, b| {
            let (a, b) = (a.last_update_time.unwrap_or(0.0), b.last_update_time.unwrap_or(0.0));
            b.total_cmp(&a)
        });
        Ok(sessions)
    }

    /// Loads a session's events and maps them to chat messages.
    ///
    /// `image_urls` are left empty; historical artifacts are resolved by the caller.
    pub async fn session_messages(&self, session: &SessionRef) -> Result<Vec<Message>> {
        let url = self.session_url(session);
        tracing::info!("[API] Fetching session messages from: {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(transport_error)?;
        let data: Value = json_or_error(response).await?;

        let Some(Value::Array(events)) = data.get("events").cloned() else {
            tracing::warn!("[API] session_messages: response has no events array");
            return Ok(Vec::new());
        };

        let total = events.len();
        let messages: Vec<Message> = events
            .into_iter()
            .filter_map(|raw| match classify_value(raw) {
                Ok(event) => history_message(event),
                Err(e) => {
                    tracing::warn!("[API] Skipping malformed history event: {}", e);
                    None
                }
            })
            .collect();

        tracing::info!(
            "[API] session_messages: parsed {} messages from {} events",
            messages.len(),
            total
        );
        Ok(messages)
    }

    /// Fetches one artifact's inline payload.
    ///
    /// Errors map onto the inline notes the chat shows: `Http` for a bad
    /// status, `Protocol` for a body missing `inlineData` fields,
    /// `Transport`/`Serialization` for network or JSON failures.
    pub async fn fetch_artifact(&self, session: &SessionRef, filename: &str) -> Result<ArtifactPayload> {
        let url = self.artifact_url(session, filename);
        tracing::debug!("[Artifact] Fetching image artifact: {}", url);

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let envelope: ArtifactEnvelope = json_or_error(response).await?;

        match envelope.inline_data {
            Some(InlineData {
                data: Some(data),
                mime_type: Some(mime_type),
            }) => Ok(ArtifactPayload { data, mime_type }),
            _ => Err(ChatError::protocol(format!(
                "artifact {} is missing inlineData.data or inlineData.mimeType",
                filename
            ))),
        }
    }
}

#[async_trait]
impl SessionBackend for AgentApiClient {
    async fn create_session(&self, session: &SessionRef) -> Result<()> {
        let response = self
            .client
            .post(self.session_url(session))
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    "[Session] Error calling create session API for {} (app {}): {}",
                    session.id,
                    session.app_name,
                    e
                );
                transport_error(e)
            })?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            tracing::error!(
                "[Session] Failed to create backend session {} for user {} with app {}: {}",
                session.id,
                session.user_id,
                session.app_name,
                err
            );
            return Err(err);
        }

        tracing::info!(
            "[Session] Backend session {} for app {} created for user {}",
            session.id,
            session.app_name,
            session.user_id
        );
        Ok(())
    }
}

fn session_info_from(entry: &Value) -> SessionInfo {
    let field = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    SessionInfo {
        id: field("id"),
        app_name: field("appName"),
        user_id: field("userId"),
        last_update_time: entry.get("lastUpdateTime").and_then(Value::as_f64),
        display_name: first_user_text(entry)
            .map(|text| SessionInfo::display_name_from(&text))
            .unwrap_or_default(),
    }
}

/// Text of the first text part of the first user event that has one.
fn first_user_text(entry: &Value) -> Option<String> {
    entry
        .get("events")?
        .as_array()?
        .iter()
        .filter(|event| event.get("author").and_then(Value::as_str) == Some("user"))
        .find_map(|event| {
            event
                .pointer("/content/parts")?
                .as_array()?
                .iter()
                .find_map(|part| part.get("text").and_then(Value::as_str).filter(|t| !t.is_empty()))
                .map(String::from)
        })
}

fn history_message(event: AgentEvent) -> Option<Message> {
    let role = if event.is_from_user() {
        MessageRole::User
    } else {
        MessageRole::Assistant
    };
    let text = event.text().trim().to_string();
    let filenames = history_artifact_filenames(&event);

    let keep = !text.is_empty() || (role == MessageRole::Assistant && !filenames.is_empty());
    if !keep {
        return None;
    }

    let mut message = Message::historical(event.id, role, text);
    message.invocation_id = event.invocation_id;
    if !filenames.is_empty() {
        message.artifact_filenames = Some(filenames);
    }
    Some(message)
}

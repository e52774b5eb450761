//! Chat surface: submission, the SSE read loop, and artifact resolution.

use std::sync::Arc;

use adkchat_application::assembler::{MessageAssembler, Outcome};
use adkchat_application::{AppContext, HistoryLoader, MessageStore, SessionManager};
use adkchat_core::error::{ChatError, Result};
use adkchat_core::event::StreamInvocation;
use adkchat_core::message::Message;
use adkchat_core::session::SessionRef;
use adkchat_interaction::artifact::{data_uri, strip_wrapping_quotes};
use adkchat_interaction::{AgentApiClient, FrameDecoder, RunSseRequest, classify_payload};
use futures::StreamExt;
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::notice::ChatNotice;
use crate::stream_controller::{
    REASON_APP_CHANGED, REASON_NEW_SUBMISSION, REASON_UNMOUNT, StreamController, StreamHandle,
    StreamStatus,
};

const NO_RESPONSE_BODY: &str = "No response body";

/// Owns the message list and the active stream of one chat surface.
pub struct ChatController {
    messages: MessageStore,
    streams: Arc<StreamController>,
    sessions: Arc<SessionManager>,
    client: Arc<AgentApiClient>,
    history: HistoryLoader,
    /// Cancels image fetches of the last loaded session.
    history_fetches: std::sync::Mutex<CancellationToken>,
    notices: mpsc::UnboundedSender<ChatNotice>,
}

impl ChatController {
    pub fn new(
        client: Arc<AgentApiClient>,
        sessions: Arc<SessionManager>,
        notices: mpsc::UnboundedSender<ChatNotice>,
    ) -> Self {
        Self {
            messages: MessageStore::new(),
            streams: Arc::new(StreamController::new()),
            history: HistoryLoader::new(client.clone()),
            history_fetches: std::sync::Mutex::new(CancellationToken::new()),
            sessions,
            client,
            notices,
        }
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn streams(&self) -> &Arc<StreamController> {
        &self.streams
    }

    /// Abandons pending historical image fetches and returns a fresh token.
    fn restart_history_fetches(&self) -> CancellationToken {
        let mut current = self
            .history_fetches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    fn notify(&self, notice: ChatNotice) {
        let _ = self.notices.send(notice);
    }

    /// Cancels the active stream, if any.
    pub fn cancel(&self, reason: &str) -> bool {
        self.streams.cancel(reason)
    }

    /// Sends `text` to `app` and starts streaming the reply.
    ///
    /// Returns the stream task, which resolves to the stream's final status,
    /// or `None` when nothing was sent.
    pub async fn submit(&self, app: &str, text: &str) -> Option<JoinHandle<StreamStatus>> {
        let invocation = StreamInvocation::new();
        let handle = self
            .streams
            .begin(&invocation.frontend_invocation_id, REASON_NEW_SUBMISSION);

        if text.trim().is_empty() {
            self.notify(ChatNotice::Info("Please enter a message.".into()));
            self.streams.finish(&handle, StreamStatus::Idle);
            return None;
        }

        self.messages
            .push(Message::user(&invocation.frontend_invocation_id, text))
            .await;

        let session = match self.sessions.session_ref(app).await {
            Ok(session) => session,
            Err(e) => {
                let details = e.user_message();
                tracing::error!("[Session] Could not resolve session for {}: {}", app, details);
                if !handle.token.is_cancelled() {
                    self.notify(ChatNotice::Error(format!(
                        "Session error for {}: {}",
                        app, details
                    )));
                    self.messages
                        .push(Message::assistant_notice(format!("Session error: {}", details)))
                        .await;
                }
                self.streams
                    .finish(&handle, StreamStatus::Failed(details));
                return None;
            }
        };

        let run = StreamRun {
            request: RunSseRequest::new(&session, text, invocation.frontend_invocation_id.clone()),
            session,
            assembler: MessageAssembler::new(invocation),
            client: self.client.clone(),
            messages: self.messages.clone(),
            notices: self.notices.clone(),
            token: handle.token.clone(),
            fetches: Vec::new(),
        };
        let streams = self.streams.clone();

        Some(tokio::spawn(async move {
            let status = run.execute().await;
            streams.finish(&handle, status.clone());
            status
        }))
    }

    /// Selects another app, dropping the stream and the messages of the old one.
    pub async fn switch_app(&self, context: &mut AppContext, app: &str) -> bool {
        if !context.select_app(app) {
            return false;
        }
        self.streams.cancel(REASON_APP_CHANGED);
        self.restart_history_fetches();
        self.messages.clear().await;
        true
    }

    /// Switches to an existing session and shows its history.
    ///
    /// Returns once the text is in the store; images follow in the
    /// background and are dropped if another session is loaded first.
    pub async fn load_session(
        &self,
        context: &mut AppContext,
        session_id: &str,
        app: Option<&str>,
    ) -> Result<usize> {
        self.streams.cancel(REASON_APP_CHANGED);
        context.load_session_context(session_id, app).await?;

        let app_name = context
            .selected_app()
            .ok_or_else(|| ChatError::internal("no app selected after loading a session"))?
            .to_string();
        let user_id = self.sessions.user_id().await?;
        let session = SessionRef::new(app_name, user_id, session_id);

        match self.history.load(&session).await {
            Ok(messages) => {
                let count = messages.len();
                let with_artifacts: Vec<Message> = messages
                    .iter()
                    .filter(|m| m.artifact_filenames.as_ref().is_some_and(|f| !f.is_empty()))
                    .cloned()
                    .collect();
                self.messages.replace_all(messages).await;

                let token = self.restart_history_fetches();
                if !with_artifacts.is_empty() {
                    let history = self.history.clone();
                    let store = self.messages.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = token.cancelled() => {
                                tracing::debug!(
                                    "[Artifact] Historical image fetches for session {} abandoned",
                                    session.id
                                );
                            }
                            _ = history.attach_images(&session, &with_artifacts, &store) => {}
                        }
                    });
                }
                self.notify(ChatNotice::Success(format!("Loaded session {}", session_id)));
                Ok(count)
            }
            Err(e) => {
                self.restart_history_fetches();
                self.messages.clear().await;
                self.notify(ChatNotice::Error(format!(
                    "Failed to load session {}: {}",
                    session_id,
                    e.user_message()
                )));
                Err(e)
            }
        }
    }

    /// Starts a fresh backend session for the selected app.
    pub async fn start_new_session(&self, context: &mut AppContext) -> Result<String> {
        let app = context
            .selected_app()
            .map(String::from)
            .unwrap_or_default();
        match context.start_new_session(&app).await {
            Ok(session_id) => {
                self.streams.cancel(REASON_APP_CHANGED);
                self.restart_history_fetches();
                self.messages.clear().await;
                self.notify(ChatNotice::Success(format!("Started new session {}", session_id)));
                Ok(session_id)
            }
            Err(e) => {
                self.notify(ChatNotice::Error(format!(
                    "Could not start a new session: {}",
                    e.user_message()
                )));
                Err(e)
            }
        }
    }

    /// Tears the surface down.
    pub fn shutdown(&self) {
        self.streams.cancel(REASON_UNMOUNT);
        self.restart_history_fetches().cancel();
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State of one spawned stream.
struct StreamRun {
    request: RunSseRequest,
    session: SessionRef,
    assembler: MessageAssembler,
    client: Arc<AgentApiClient>,
    messages: MessageStore,
    notices: mpsc::UnboundedSender<ChatNotice>,
    token: CancellationToken,
    fetches: Vec<JoinHandle<()>>,
}

impl StreamRun {
    /// Runs the stream to its end. Artifact fetches it started are awaited
    /// before reporting completion.
    async fn execute(mut self) -> StreamStatus {
        let status = self.read_stream().await;
        if !self.fetches.is_empty() {
            join_all(std::mem::take(&mut self.fetches)).await;
        }
        if self.token.is_cancelled() {
            return StreamStatus::Cancelled("stream cancelled".into());
        }
        status
    }

    fn cancelled(&self) -> StreamStatus {
        tracing::info!(
            "[SSE] Stream aborted for frontend invocation {}",
            self.request.invocation_id
        );
        StreamStatus::Cancelled("stream cancelled".into())
    }

    async fn read_stream(&mut self) -> StreamStatus {
        let sent = tokio::select! {
            _ = self.token.cancelled() => return self.cancelled(),
            sent = self.client.run_sse(&self.request) => sent,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => return self.connection_error(e).await,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                _ = self.token.cancelled() => return self.cancelled(),
                body = response.text() => body.unwrap_or_default(),
            };
            if self.token.is_cancelled() {
                return self.cancelled();
            }
            let body = if body.is_empty() {
                NO_RESPONSE_BODY.to_string()
            } else {
                body
            };
            tracing::error!("[SSE] Backend returned {}: {}", status.as_u16(), body);
            let _ = self.notices.send(ChatNotice::Error(format!(
                "Backend error for {} ({}): {}",
                self.session.app_name,
                status.as_u16(),
                body
            )));
            self.messages
                .push(Message::assistant_notice(format!(
                    "Error from backend ({}): {}",
                    status.as_u16(),
                    body
                )))
                .await;
            return StreamStatus::Failed(format!("HTTP {}", status.as_u16()));
        }

        let mut stream = response.bytes_stream();
        let mut decoder = FrameDecoder::new();

        loop {
            let next = tokio::select! {
                _ = self.token.cancelled() => return self.cancelled(),
                chunk = stream.next() => chunk,
            };

            match next {
                None => break,
                Some(Err(e)) => {
                    return self
                        .connection_error(ChatError::transport(e.to_string()))
                        .await;
                }
                Some(Ok(chunk)) => {
                    for payload in decoder.push(&chunk) {
                        if self.token.is_cancelled() {
                            return self.cancelled();
                        }
                        self.handle_payload(&payload).await;
                    }
                }
            }
        }

        if decoder.pending() > 0 {
            tracing::debug!(
                "[SSE] Stream ended with {} undelimited bytes",
                decoder.pending()
            );
        }
        match self.assembler.invocation().backend_id() {
            Some(backend_id) if self.assembler.state().open_message_id.is_none() => {
                tracing::info!(
                    "[SSE] Stream ended without displayable content for backend invocation {}",
                    backend_id
                );
            }
            backend_id => tracing::info!(
                "[SSE] Stream finished. Frontend {}, backend {:?}",
                self.request.invocation_id,
                backend_id
            ),
        }
        StreamStatus::Completed
    }

    async fn handle_payload(&mut self, payload: &str) {
        let event = match classify_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("[SSE] Dropping unparsable frame: {}", e);
                return;
            }
        };

        if let Outcome::Applied {
            message_id,
            artifacts,
        } = self.messages.apply_event(&mut self.assembler, &event).await
        {
            if !artifacts.is_empty() {
                tracing::debug!(
                    "[Artifact] Fetching {} image artifacts for message {}",
                    artifacts.len(),
                    message_id
                );
            }
            for filename in artifacts {
                let fetch = self.spawn_artifact_fetch(message_id.clone(), filename);
                self.fetches.push(fetch);
            }
        }
    }

    /// Fetches one artifact into the message it was discovered for.
    fn spawn_artifact_fetch(&self, message_id: String, filename: String) -> JoinHandle<()> {
        let client = self.client.clone();
        let messages = self.messages.clone();
        let session = self.session.clone();
        let token = self.token.clone();

        tokio::spawn(async move {
            let filename = strip_wrapping_quotes(&filename);
            let result = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("[Artifact] Fetch aborted for {}", filename);
                    return;
                }
                result = client.fetch_artifact(&session, &filename) => result,
            };
            if token.is_cancelled() {
                tracing::debug!("[Artifact] Fetch for {} settled after cancel; dropped", filename);
                return;
            }

            match result {
                Ok(payload) => {
                    messages.append_image(&message_id, data_uri(&payload)).await;
                }
                Err(e) => {
                    tracing::error!("[Artifact] Failed to load {}: {}", filename, e);
                    messages
                        .append_content(&message_id, &artifact_error_line(&filename, &e))
                        .await;
                }
            }
        })
    }

    /// Surfaces a transport failure unless it stems from cancellation.
    async fn connection_error(&self, error: ChatError) -> StreamStatus {
        if self.token.is_cancelled() {
            return self.cancelled();
        }
        let message = error.user_message();
        tracing::error!(
            "[SSE] Stream error for frontend invocation {}: {}",
            self.request.invocation_id,
            message
        );
        let _ = self.notices.send(ChatNotice::Error(format!(
            "Stream connection error: {}",
            message
        )));
        self.messages
            .push(Message::assistant_notice(format!(
                "Stream connection error: {}",
                message
            )))
            .await;
        StreamStatus::Failed(message)
    }
}

/// Inline note appended to a message whose image could not be loaded.
pub fn artifact_error_line(filename: &str, error: &ChatError) -> String {
    match error {
        ChatError::Http { status, .. } => {
            format!("\n[Error loading image: {} ({})]", filename, status)
        }
        ChatError::Protocol(_) => {
            format!("\n[Error processing image data structure for: {}]", filename)
        }
        _ => format!("\n[Network or parse error for image: {}]", filename),
    }
}

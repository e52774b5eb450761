//! Selected app, current session and the recent-sessions list.

use std::sync::Arc;

use adkchat_core::error::{Result, SessionError};
use adkchat_core::session::SessionInfo;
use adkchat_interaction::AgentApiClient;

use crate::session_manager::SessionManager;

pub struct AppContext {
    client: Arc<AgentApiClient>,
    sessions: Arc<SessionManager>,
    apps: Vec<String>,
    selected_app: Option<String>,
    app_list_error: Option<String>,
    current_session_id: Option<String>,
    recent_sessions: Vec<SessionInfo>,
}

impl AppContext {
    pub fn new(client: Arc<AgentApiClient>, sessions: Arc<SessionManager>) -> Self {
        Self {
            client,
            sessions,
            apps: Vec::new(),
            selected_app: None,
            app_list_error: None,
            current_session_id: None,
            recent_sessions: Vec::new(),
        }
    }

    pub fn apps(&self) -> &[String] {
        &self.apps
    }

    pub fn selected_app(&self) -> Option<&str> {
        self.selected_app.as_deref()
    }

    pub fn app_list_error(&self) -> Option<&str> {
        self.app_list_error.as_deref()
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn recent_sessions(&self) -> &[SessionInfo] {
        &self.recent_sessions
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Lists the apps and selects `preferred` if offered, else the first one.
    ///
    /// A listing failure is recorded in `app_list_error` rather than returned.
    pub async fn init(&mut self, preferred: Option<&str>) {
        match self.client.list_apps().await {
            Ok(apps) => {
                self.app_list_error = None;
                let choice = preferred
                    .filter(|name| apps.iter().any(|a| a == name))
                    .map(String::from)
                    .or_else(|| apps.first().cloned());
                self.apps = apps;
                if choice != self.selected_app {
                    self.current_session_id = None;
                    self.recent_sessions.clear();
                }
                self.selected_app = choice;
                tracing::info!(
                    "[API] {} apps available, selected {:?}",
                    self.apps.len(),
                    self.selected_app
                );
            }
            Err(e) => {
                tracing::error!("[API] Failed to list apps: {}", e);
                self.app_list_error = Some(e.user_message());
                self.apps.clear();
            }
        }
    }

    /// Selects an app from the list. Returns `true` if the selection changed.
    pub fn select_app(&mut self, name: &str) -> bool {
        if !self.apps.iter().any(|a| a == name) {
            tracing::warn!("[API] Attempted to select unknown app: {}", name);
            return false;
        }
        if self.selected_app.as_deref() == Some(name) {
            return false;
        }

        self.selected_app = Some(name.to_string());
        self.current_session_id = None;
        self.recent_sessions.clear();
        tracing::info!("[API] Selected app {}", name);
        true
    }

    /// Switches to an existing session, changing app first if `app` differs.
    ///
    /// # Errors
    ///
    /// `SessionError::MissingAppName` when neither `app` nor a selection exists.
    pub async fn load_session_context(&mut self, session_id: &str, app: Option<&str>) -> Result<()> {
        let app_name = match app.or(self.selected_app.as_deref()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(SessionError::MissingAppName.into()),
        };

        if self.selected_app.as_deref() != Some(app_name.as_str()) {
            if !self.apps.iter().any(|a| *a == app_name) {
                self.apps.push(app_name.clone());
            }
            self.select_app(&app_name);
        }

        self.sessions.set_session_id_for_app(&app_name, session_id).await?;
        self.current_session_id = Some(session_id.to_string());
        Ok(())
    }

    /// Creates a fresh backend session for `app`.
    ///
    /// On failure the current session is kept and the error returned.
    pub async fn start_new_session(&mut self, app: &str) -> Result<String> {
        let session_id = self.sessions.renew_session_id(app).await?;
        self.current_session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Records the id the session manager resolved for a submission.
    pub fn note_current_session(&mut self, session_id: &str) {
        self.current_session_id = Some(session_id.to_string());
    }

    /// Reloads the recent sessions of the selected app.
    pub async fn refresh_recent_sessions(&mut self) -> Result<&[SessionInfo]> {
        let Some(app) = self.selected_app.clone() else {
            self.recent_sessions.clear();
            return Ok(&self.recent_sessions);
        };
        let user_id = self.sessions.user_id().await?;
        self.recent_sessions = self.client.list_sessions(&app, &user_id).await?;
        Ok(&self.recent_sessions)
    }
}

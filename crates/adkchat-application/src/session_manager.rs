use std::sync::Arc;

use adkchat_core::error::{ChatError, Result, SessionError};
use adkchat_core::session::{SessionBackend, SessionRef};
use adkchat_core::store::{KeyValueStore, SESSION_ID_KEY, USER_ID_KEY};
use uuid::Uuid;

/// Resolves the user and session identifiers a chat request needs.
///
/// `SessionManager` is responsible for:
/// - Generating and persisting the user id on first use
/// - Creating backend sessions before their id is persisted
/// - Switching to an existing session without a backend call
///
/// The session id key is shared across apps, so switching apps does not
/// by itself create a new session.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<dyn SessionBackend>,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `store` - Persistent string store holding `userId` and `sessionId`
    /// * `backend` - The session-creation call
    pub fn new(store: Arc<dyn KeyValueStore>, backend: Arc<dyn SessionBackend>) -> Self {
        Self { store, backend }
    }

    /// Returns the stored user id, generating and storing one if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn user_id(&self) -> Result<String> {
        if let Some(user_id) = self.store.get(USER_ID_KEY).await? {
            return Ok(user_id);
        }

        let user_id = Uuid::new_v4().to_string();
        self.store.set(USER_ID_KEY, &user_id).await?;
        tracing::info!("[Session] Generated new user id {}", user_id);
        Ok(user_id)
    }

    /// Returns the stored session id, creating a backend session if none exists.
    ///
    /// # Errors
    ///
    /// - `SessionError::MissingAppName` when `app_name` is empty and no id is stored
    /// - `SessionError::BackendCreationFailed` when the backend rejects the new session;
    ///   the store is left unchanged
    pub async fn session_id(&self, app_name: &str) -> Result<String> {
        if let Some(session_id) = self.store.get(SESSION_ID_KEY).await? {
            return Ok(session_id);
        }
        self.create_and_store(app_name).await
    }

    /// Always creates a new backend session and stores its id on success.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::session_id`].
    pub async fn renew_session_id(&self, app_name: &str) -> Result<String> {
        self.create_and_store(app_name).await
    }

    /// Stores an existing session id without contacting the backend.
    pub async fn set_session_id_for_app(&self, app_name: &str, session_id: &str) -> Result<()> {
        self.store.set(SESSION_ID_KEY, session_id).await?;
        tracing::info!("[Session] Switched to session {} for app {}", session_id, app_name);
        Ok(())
    }

    pub async fn clear_session_id(&self) -> Result<()> {
        self.store.remove(SESSION_ID_KEY).await
    }

    /// Resolves both ids into a session reference for `app_name`.
    pub async fn session_ref(&self, app_name: &str) -> Result<SessionRef> {
        let user_id = self.user_id().await?;
        let session_id = self.session_id(app_name).await?;
        Ok(SessionRef::new(app_name, user_id, session_id))
    }

    async fn create_and_store(&self, app_name: &str) -> Result<String> {
        if app_name.is_empty() {
            tracing::error!("[Session] Cannot create a session without an app name");
            return Err(SessionError::MissingAppName.into());
        }

        let user_id = self.user_id().await?;
        let session_id = Uuid::new_v4().to_string();
        let session = SessionRef::new(app_name, &user_id, &session_id);

        if let Err(e) = self.backend.create_session(&session).await {
            tracing::error!(
                "[Session] Backend session creation failed for {} (app {}): {}",
                session_id,
                app_name,
                e
            );
            return Err(ChatError::Session(SessionError::BackendCreationFailed { session_id }));
        }

        self.store.set(SESSION_ID_KEY, &session_id).await?;
        tracing::info!("[Session] Stored new session id {} for app {}", session_id, app_name);
        Ok(session_id)
    }
}

//! Client for the user service (`/api/register`, `/api/login`, `/api/users`).

use adkchat_core::error::{ChatError, Result};
use adkchat_core::user::{AuthToken, Credentials, UserAccount};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};

use crate::http::{error_from_response, join_url, json_or_error, transport_error};

#[derive(Clone, Debug)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<AuthToken> {
        self.post_credentials("register", credentials).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthToken> {
        self.post_credentials("login", credentials).await
    }

    /// Lists accounts; requires a token from register or login.
    pub async fn list_users(&self, token: &AuthToken) -> Result<Vec<UserAccount>> {
        let response = self
            .client
            .get(join_url(&self.base_url, "users"))
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(auth_error(response).await);
        }
        json_or_error(response).await
    }

    async fn post_credentials(&self, path: &str, credentials: &Credentials) -> Result<AuthToken> {
        let response = self
            .client
            .post(join_url(&self.base_url, path))
            .json(credentials)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(auth_error(response).await);
        }
        json_or_error(response).await
    }
}

/// Maps a 401 `{message}` body to [`ChatError::Auth`].
async fn auth_error(response: reqwest::Response) -> ChatError {
    match error_from_response(response).await {
        ChatError::Http { body, .. } => {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(body);
            ChatError::Auth(message)
        }
        other => other,
    }
}

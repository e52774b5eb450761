use anyhow::Result;

use adkchat_core::user::{AuthToken, Credentials};
use adkchat_interaction::AuthClient;

use super::{Output, user_facing};

pub struct AuthCommand {
    client: AuthClient,
    output: Output,
}

impl AuthCommand {
    pub fn new(base_url: &str, output: Output) -> Self {
        Self {
            client: AuthClient::new(base_url),
            output,
        }
    }

    pub async fn register(&self, username: String, password: String) -> Result<()> {
        let token = self
            .client
            .register(&Credentials { username, password })
            .await
            .map_err(user_facing)?;
        self.print_token(&token)
    }

    pub async fn login(&self, username: String, password: String) -> Result<()> {
        let token = self
            .client
            .login(&Credentials { username, password })
            .await
            .map_err(user_facing)?;
        self.print_token(&token)
    }

    pub async fn users(&self, token: String) -> Result<()> {
        let users = self
            .client
            .list_users(&AuthToken { token })
            .await
            .map_err(user_facing)?;

        self.output.emit(&users, || {
            for user in &users {
                println!("{}  {}", user.id, user.username);
            }
        })
    }

    fn print_token(&self, token: &AuthToken) -> Result<()> {
        self.output.emit(token, || println!("{}", token.token))
    }
}

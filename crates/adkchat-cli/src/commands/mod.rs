pub mod apps;
pub mod auth;
pub mod kb;
pub mod sessions;

use adkchat_core::error::ChatError;
use serde::Serialize;

/// Chooses between human-readable and JSON output.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Prints `value` as JSON, or runs `text` to print it for humans.
    pub fn emit<T: Serialize + ?Sized>(&self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }
}

/// Converts a client error into the message the chat UI would show.
pub fn user_facing(error: ChatError) -> anyhow::Error {
    anyhow::anyhow!(error.user_message())
}

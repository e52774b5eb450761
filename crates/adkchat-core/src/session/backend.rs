use async_trait::async_trait;

use super::model::SessionRef;
use crate::error::Result;

/// Backend call that registers a new conversation.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Creates `session` on the backend. Any 2xx answer is success.
    async fn create_session(&self, session: &SessionRef) -> Result<()>;
}

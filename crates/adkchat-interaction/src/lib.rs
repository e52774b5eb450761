pub mod agent_client;
pub mod artifact;
pub mod auth_client;
pub mod classifier;
pub mod http;
pub mod knowledge_client;
pub mod sse;

pub use agent_client::{AgentApiClient, RunSseRequest};
pub use auth_client::AuthClient;
pub use classifier::classify_payload;
pub use knowledge_client::{KnowledgeBaseClient, UploadAccepted, WorkflowStarted};
pub use sse::FrameDecoder;

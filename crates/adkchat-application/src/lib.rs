//! Application layer for ADKChat.
//!
//! Coordinates the core types and the HTTP clients: assembling streamed
//! events into messages, resolving session identity, loading history and
//! tracking knowledge-base workflows.

pub mod app_context;
pub mod assembler;
pub mod history;
pub mod knowledge_base;
pub mod message_store;
pub mod session_manager;

pub use app_context::AppContext;
pub use assembler::{MessageAssembler, Outcome};
pub use history::HistoryLoader;
pub use knowledge_base::{KnowledgeBase, PollDecision, apply_workflow_status};
pub use message_store::MessageStore;
pub use session_manager::SessionManager;

pub mod artifact;
pub mod config;
pub mod error;
pub mod event;
pub mod knowledge;
pub mod message;
pub mod session;
pub mod store;
pub mod user;

// Re-export common error type
pub use error::{ChatError, Result, SessionError};

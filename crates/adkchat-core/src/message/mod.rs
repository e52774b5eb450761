//! Chat message domain.
//!
//! Messages are the unit the chat surface renders. Assistant messages are
//! built incrementally from stream events and later joined by id when
//! artifact fetches settle.

pub mod model;

pub use model::{Attachment, Message, MessageRole};

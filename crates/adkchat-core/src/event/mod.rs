//! Typed agent stream events.
//!
//! The wire payloads are duck-typed JSON; the classifier validates them into
//! these closed unions at the boundary so downstream code never touches raw
//! JSON except through [`EventPart::Unrecognized`].

pub mod invocation;
pub mod model;

pub use invocation::{Admission, StreamInvocation};
pub use model::{AgentEvent, EventAction, EventPart};

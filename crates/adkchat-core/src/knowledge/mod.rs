pub mod model;

pub use model::{KbFile, KbFileStatus, WorkflowStatus};

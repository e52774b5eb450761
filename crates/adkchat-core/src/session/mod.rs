pub mod backend;
pub mod model;

pub use backend::SessionBackend;
pub use model::{SessionInfo, SessionRef};

//! Runtime side of ADKChat: the chat surface with its stream lifecycle,
//! plus logging setup shared by the binaries.

pub mod chat_controller;
pub mod diagnostic_layer;
pub mod logging;
pub mod notice;
pub mod stream_controller;

pub use chat_controller::ChatController;
pub use diagnostic_layer::{Diagnostic, DiagnosticLayer};
pub use logging::{LoggingOptions, init_logging};
pub use notice::ChatNotice;
pub use stream_controller::{StreamController, StreamHandle, StreamStatus};

use adkchat_core::error::{ChatError, Result};
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::diagnostic_layer::{Diagnostic, DiagnosticLayer};

/// Global subscriber settings.
#[derive(Debug, Default)]
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or `"warn,adkchat_execution=info"`.
    pub default_filter: Option<String>,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Skip stderr output entirely; only the diagnostics channel receives records.
    pub quiet: bool,
    /// Also queue WARN/ERROR records into this channel.
    pub diagnostics: Option<mpsc::UnboundedSender<Diagnostic>>,
}

/// Installs the process-wide tracing subscriber.
///
/// Output goes to stderr. Fails if a subscriber is already installed.
pub fn init_logging(options: LoggingOptions) -> Result<()> {
    let default_filter = options.default_filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console = !options.quiet;
    let text_layer =
        (console && !options.json).then(|| fmt::layer().with_writer(std::io::stderr));
    let json_layer =
        (console && options.json).then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(options.diagnostics.map(DiagnosticLayer::new))
        .try_init()
        .map_err(|e| ChatError::internal(format!("failed to install tracing subscriber: {}", e)))
}

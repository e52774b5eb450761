//! Tracing layer that forwards warnings and errors to the terminal client.
//!
//! The interactive client keeps stderr quiet while a prompt is on screen,
//! so problems are queued here and shown on demand.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// One captured log record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    /// Module path of the emitting code, e.g. `adkchat_execution::chat_controller`
    pub target: String,
    pub level: String,
    pub message: String,
    /// Structured fields other than `message`
    pub fields: HashMap<String, Value>,
    /// Name of the innermost span, if any
    pub span: Option<String>,
    pub timestamp: String,
}

/// Sends every event at or above `threshold` severity into a channel.
pub struct DiagnosticLayer {
    sender: mpsc::UnboundedSender<Diagnostic>,
    threshold: Level,
}

impl DiagnosticLayer {
    /// Forwards WARN and ERROR.
    pub fn new(sender: mpsc::UnboundedSender<Diagnostic>) -> Self {
        Self::with_threshold(sender, Level::WARN)
    }

    pub fn with_threshold(sender: mpsc::UnboundedSender<Diagnostic>, threshold: Level) -> Self {
        Self { sender, threshold }
    }
}

impl<S> Layer<S> for DiagnosticLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // tracing orders levels by verbosity: ERROR < WARN < INFO.
        if *metadata.level() > self.threshold {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        let message = match fields.remove("message") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let diagnostic = Diagnostic {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            message,
            fields,
            span: ctx.lookup_current().map(|span| span.name().to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // The receiver may be gone during shutdown.
        let _ = self.sender.send(diagnostic);
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{:?}", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_forwards_only_warnings_and_errors() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriber = tracing_subscriber::registry().with(DiagnosticLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("[SSE] connected");
            let span = tracing::info_span!("stream");
            let _guard = span.enter();
            tracing::warn!(expected = "i1", received = 7u64, "[Assembler] mismatch");
            tracing::error!("[Artifact] failed");
        });

        let warning = rx.try_recv().unwrap();
        assert_eq!(warning.level, "WARN");
        assert_eq!(warning.message, "[Assembler] mismatch");
        assert_eq!(warning.fields.get("expected"), Some(&serde_json::json!("i1")));
        assert_eq!(warning.fields.get("received"), Some(&serde_json::json!(7)));
        assert_eq!(warning.span.as_deref(), Some("stream"));

        let error = rx.try_recv().unwrap();
        assert_eq!(error.level, "ERROR");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_threshold_can_include_info() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriber =
            tracing_subscriber::registry().with(DiagnosticLayer::with_threshold(tx, Level::INFO));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::info!("shown");
        });

        assert_eq!(rx.try_recv().unwrap().message, "shown");
        assert!(rx.try_recv().is_err());
    }
}

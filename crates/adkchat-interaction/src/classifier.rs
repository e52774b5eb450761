//! Event classifier.
//!
//! Validates one SSE payload (or one history event) into an [`AgentEvent`].
//! Part kinds follow the backend's truthiness rules: an empty `text` does
//! not count as a text part, and the first present key wins in the order
//! text, functionCall, functionResponse, inlineData.

use adkchat_core::error::{ChatError, Result};
use adkchat_core::event::model::{UNKNOWN_FUNCTION, UNKNOWN_FUNCTION_RESPONSE};
use adkchat_core::event::{AgentEvent, EventAction, EventPart};
use serde::Deserialize;
use serde_json::{Map, Value};

const LOG_DATA_LIMIT: usize = 100;
const LOG_DATA_KEEP: usize = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(default)]
    id: Option<Value>,
    /// Routing key; a non-string id is a protocol error.
    #[serde(default)]
    invocation_id: Option<String>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    actions: Option<WireActions>,
    #[serde(default)]
    partial: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireActions {
    #[serde(default)]
    artifact_delta: Option<Map<String, Value>>,
    #[serde(default)]
    state_delta: Option<Map<String, Value>>,
}

/// Parses one frame payload.
///
/// A parse failure is returned as [`ChatError::Protocol`]; the caller logs
/// and drops the frame without ending the stream.
pub fn classify_payload(payload: &str) -> Result<AgentEvent> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ChatError::protocol(format!("invalid event JSON: {}", e)))?;
    classify_value(value)
}

/// Classifies an already parsed event object.
pub fn classify_value(value: Value) -> Result<AgentEvent> {
    let wire: WireEvent = serde_json::from_value(value)
        .map_err(|e| ChatError::protocol(format!("unexpected event shape: {}", e)))?;

    let parts = wire
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .map(classify_part)
        .collect();

    let mut actions = Vec::new();
    if let Some(wire_actions) = wire.actions {
        if let Some(delta) = wire_actions.artifact_delta {
            actions.push(EventAction::ArtifactDelta {
                filenames: delta.keys().cloned().collect(),
            });
        }
        if let Some(state) = wire_actions.state_delta {
            let image_plot_filename = match state.get("image_plot_filename") {
                Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
                Some(Value::Null) | None => None,
                Some(other) => {
                    tracing::debug!("[SSE] Ignoring non-string image_plot_filename: {}", other);
                    None
                }
            };
            actions.push(EventAction::StateDelta {
                image_plot_filename,
            });
        }
    }

    Ok(AgentEvent {
        id: wire.id.and_then(scalar_string),
        invocation_id: wire.invocation_id,
        author: wire.author.and_then(scalar_string),
        parts,
        actions,
        // Only a literal boolean counts; anything else reads as "not false".
        partial: wire.partial.and_then(|v| v.as_bool()),
    })
}

/// Descriptive fields tolerate numbers; other shapes are dropped.
fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn classify_part(part: Value) -> EventPart {
    if let Some(text) = part.get("text").and_then(Value::as_str).filter(|t| !t.is_empty()) {
        return EventPart::Text {
            text: text.to_string(),
        };
    }
    if let Some(call) = part.get("functionCall").filter(|v| is_truthy(v)) {
        return EventPart::FunctionCall {
            name: function_name(call, UNKNOWN_FUNCTION),
        };
    }
    if let Some(response) = part.get("functionResponse").filter(|v| is_truthy(v)) {
        return EventPart::FunctionResponse {
            name: function_name(response, UNKNOWN_FUNCTION_RESPONSE),
        };
    }
    if let Some(inline) = part.get("inlineData").filter(|v| is_truthy(v)) {
        let field = |key: &str| {
            inline
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return EventPart::InlineData {
            mime_type: field("mimeType"),
            data: field("data"),
        };
    }
    EventPart::Unrecognized { raw: part }
}

fn function_name(value: &Value, fallback: &str) -> String {
    value
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Renders a part for logs with long `data` strings cut short.
pub fn part_for_log(part: &EventPart) -> String {
    match part {
        EventPart::InlineData { mime_type, data } => {
            format!("inlineData({}, {})", mime_type, truncate_for_log(data))
        }
        EventPart::Unrecognized { raw } => format!("unrecognized({})", raw),
        other => format!("{:?}", other),
    }
}

/// Keeps short strings intact and cuts long ones to a marked prefix.
pub fn truncate_for_log(data: &str) -> String {
    if data.chars().count() > LOG_DATA_LIMIT {
        let head: String = data.chars().take(LOG_DATA_KEEP).collect();
        format!("{}...[truncated]", head)
    } else {
        data.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_function_parts() {
        let event = classify_payload(
            r#"{"invocationId":"i1","partial":true,"content":{"parts":[
                {"text":"Hel"},
                {"functionCall":{"name":"run_sql","args":{}}},
                {"functionResponse":{"name":"run_sql","response":{}}},
                {"functionCall":{}}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(event.invocation_id.as_deref(), Some("i1"));
        assert_eq!(event.partial, Some(true));
        assert_eq!(
            event.parts,
            vec![
                EventPart::Text { text: "Hel".into() },
                EventPart::FunctionCall { name: "run_sql".into() },
                EventPart::FunctionResponse { name: "run_sql".into() },
                EventPart::FunctionCall { name: UNKNOWN_FUNCTION.into() },
            ]
        );
    }

    #[test]
    fn test_empty_text_falls_through() {
        let event = classify_payload(
            r#"{"content":{"parts":[{"text":"","functionResponse":{}},{"foo":1},{"inlineData":{"mimeType":"image/png","data":"AAA"}}]}}"#,
        )
        .unwrap();
        assert_eq!(
            event.parts[0],
            EventPart::FunctionResponse {
                name: UNKNOWN_FUNCTION_RESPONSE.into()
            }
        );
        assert!(matches!(event.parts[1], EventPart::Unrecognized { .. }));
        assert_eq!(
            event.parts[2],
            EventPart::InlineData {
                mime_type: "image/png".into(),
                data: "AAA".into()
            }
        );
    }

    #[test]
    fn test_actions() {
        let event = classify_payload(
            r#"{"actions":{"artifactDelta":{"chart.PNG":1,"notes.txt":0},"stateDelta":{"image_plot_filename":"plot.jpg","other":true}}}"#,
        )
        .unwrap();
        assert_eq!(event.referenced_filenames(), vec!["chart.PNG", "notes.txt", "plot.jpg"]);
    }

    #[test]
    fn test_malformed_payload_is_protocol_error() {
        let err = classify_payload("{not json").unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));

        let err = classify_payload(r#"{"invocationId":42}"#).unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn test_odd_descriptive_fields_keep_the_text() {
        let event = classify_payload(
            r#"{"invocationId":"i1","id":7,"author":{"name":"x"},"partial":"no","content":{"parts":[{"text":"kept"}]}}"#,
        )
        .unwrap();

        assert_eq!(event.id.as_deref(), Some("7"));
        assert_eq!(event.author, None);
        assert_eq!(event.partial, None);
        assert!(!event.replaces_content());
        assert_eq!(event.parts, vec![EventPart::Text { text: "kept".into() }]);

        let event = classify_payload(r#"{"partial":false,"author":"agent"}"#).unwrap();
        assert!(event.replaces_content());
        assert_eq!(event.author.as_deref(), Some("agent"));
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short"), "short");
        let long = "x".repeat(150);
        assert_eq!(truncate_for_log(&long), format!("{}...[truncated]", "x".repeat(30)));
    }
}

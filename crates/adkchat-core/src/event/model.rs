use serde::{Deserialize, Serialize};

/// Function name used when a call part carries no name.
pub const UNKNOWN_FUNCTION: &str = "unknown_function";
/// Function name used when a response part carries no name.
pub const UNKNOWN_FUNCTION_RESPONSE: &str = "unknown_function_response";

/// One entry of an event's `content.parts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPart {
    /// Text delta.
    Text { text: String },
    /// The agent requested a tool call.
    FunctionCall { name: String },
    /// A tool call returned.
    FunctionResponse { name: String },
    /// Inline binary payload. Not rendered from the stream path.
    InlineData { mime_type: String, data: String },
    /// A part of a shape we do not know.
    Unrecognized { raw: serde_json::Value },
}

/// One entry of an event's `actions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventAction {
    /// Keys of `actions.artifactDelta`.
    ArtifactDelta { filenames: Vec<String> },
    /// `actions.stateDelta`; only the plot filename is interpreted.
    StateDelta { image_plot_filename: Option<String> },
}

/// A classified agent event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: Option<String>,
    pub invocation_id: Option<String>,
    pub author: Option<String>,
    pub parts: Vec<EventPart>,
    pub actions: Vec<EventAction>,
    /// `Some(false)` marks a full replacement of the open message.
    pub partial: Option<bool>,
}

impl AgentEvent {
    /// Concatenation of all text parts, in part order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                EventPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every filename the actions reference, artifact delta keys first.
    ///
    /// No extension filtering or dedup happens here.
    pub fn referenced_filenames(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for action in &self.actions {
            if let EventAction::ArtifactDelta { filenames } = action {
                names.extend(filenames.iter().map(String::as_str));
            }
        }
        for action in &self.actions {
            if let EventAction::StateDelta {
                image_plot_filename: Some(name),
            } = action
            {
                names.push(name.as_str());
            }
        }
        names
    }

    pub fn is_from_user(&self) -> bool {
        self.author.as_deref() == Some("user")
    }

    /// Marks an explicit replacement rather than a delta.
    pub fn replaces_content(&self) -> bool {
        self.partial == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_concatenates_in_order() {
        let event = AgentEvent {
            parts: vec![
                EventPart::Text { text: "Hel".into() },
                EventPart::FunctionCall { name: "f".into() },
                EventPart::Text { text: "lo".into() },
            ],
            ..Default::default()
        };
        assert_eq!(event.text(), "Hello");
    }

    #[test]
    fn test_referenced_filenames_order() {
        let event = AgentEvent {
            actions: vec![
                EventAction::StateDelta {
                    image_plot_filename: Some("plot.png".into()),
                },
                EventAction::ArtifactDelta {
                    filenames: vec!["a.png".into(), "b.txt".into()],
                },
            ],
            ..Default::default()
        };
        assert_eq!(event.referenced_filenames(), vec!["a.png", "b.txt", "plot.png"]);
    }

    #[test]
    fn test_replaces_content_only_on_explicit_false() {
        let mut event = AgentEvent::default();
        assert!(!event.replaces_content());
        event.partial = Some(true);
        assert!(!event.replaces_content());
        event.partial = Some(false);
        assert!(event.replaces_content());
    }
}

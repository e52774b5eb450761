//! Message assembler.
//!
//! Turns classified stream events into mutations of the message list. The
//! only state kept between events is which assistant message is open:
//!
//! ```text
//! NoOpenMessage ──event with content──▶ AppendingToMessage(id)
//! AppendingToMessage(id) ──function call / id gone──▶ AppendingToMessage(new id)
//! ```
//!
//! [`transition`] is pure: it reads the current list and returns the next
//! state plus the mutation to apply. [`MessageAssembler`] wraps it with the
//! invocation binding of one stream.

use adkchat_core::event::{Admission, AgentEvent, EventPart, StreamInvocation};
use adkchat_core::message::Message;
use adkchat_interaction::artifact::discover_image_artifacts;
use adkchat_interaction::classifier::part_for_log;

/// Assembler state between events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblerState {
    pub open_message_id: Option<String>,
}

/// How an amended message's content changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentUpdate {
    Append(String),
    /// Explicit `partial: false`: the text is the complete content.
    Replace(String),
}

/// A change to the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Push a new assistant message.
    Open(Message),
    /// Update the open message in place.
    Amend {
        id: String,
        content: ContentUpdate,
        function_calls: Vec<String>,
    },
}

impl Mutation {
    pub fn message_id(&self) -> &str {
        match self {
            Mutation::Open(message) => &message.id,
            Mutation::Amend { id, .. } => id,
        }
    }

    /// Applies the mutation. Returns `false` if an amend target is missing.
    pub fn apply(self, messages: &mut Vec<Message>) -> bool {
        match self {
            Mutation::Open(message) => {
                messages.push(message);
                true
            }
            Mutation::Amend {
                id,
                content,
                function_calls,
            } => {
                let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
                    return false;
                };
                match content {
                    ContentUpdate::Append(text) => message.content.push_str(&text),
                    ContentUpdate::Replace(text) => message.content = text,
                }
                message.merge_function_calls(&function_calls);
                true
            }
        }
    }
}

/// What one event contributes, before deciding where it goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDigest {
    pub content_to_append: String,
    pub is_new_segment: bool,
    /// Function call and response names, deduplicated in first-seen order.
    pub function_calls: Vec<String>,
    /// Image artifacts discovered in this event (per-event dedup only).
    pub artifacts: Vec<String>,
}

impl EventDigest {
    pub fn is_empty(&self) -> bool {
        self.content_to_append.is_empty()
            && self.function_calls.is_empty()
            && self.artifacts.is_empty()
    }

    fn record_call(&mut self, name: &str) {
        if !self.function_calls.iter().any(|n| n == name) {
            self.function_calls.push(name.to_string());
        }
    }
}

/// Collects text, call markers, call names and artifacts of one event.
pub fn digest(event: &AgentEvent) -> EventDigest {
    let mut digest = EventDigest::default();

    for part in &event.parts {
        match part {
            EventPart::Text { text } => digest.content_to_append.push_str(text),
            EventPart::FunctionCall { name } => {
                if !digest.content_to_append.is_empty() && !digest.content_to_append.ends_with('\n') {
                    digest.content_to_append.push('\n');
                }
                digest
                    .content_to_append
                    .push_str(&format!("[Function call: {}]\n", name));
                digest.is_new_segment = true;
                digest.record_call(name);
            }
            EventPart::FunctionResponse { name } => digest.record_call(name),
            EventPart::InlineData { .. } => {
                tracing::debug!(
                    "[Assembler] Inline data part not rendered from the stream: {}",
                    part_for_log(part)
                );
            }
            EventPart::Unrecognized { .. } => {
                tracing::debug!("[Assembler] Unrecognized part: {}", part_for_log(part));
            }
        }
    }

    digest.artifacts = discover_image_artifacts(event);
    digest
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub mutation: Option<Mutation>,
    /// Artifacts to fetch for the message the event landed in.
    pub artifacts: Vec<String>,
}

/// Pure transition: `(state, event) -> (state, mutation)`.
///
/// `backend_id` is the bound invocation id; `messages` is the list as it
/// is right now, used only to check whether the open message still exists.
pub fn transition(
    state: &AssemblerState,
    event: &AgentEvent,
    backend_id: Option<&str>,
    messages: &[Message],
) -> (AssemblerState, Step) {
    let digest = digest(event);
    if digest.is_empty() {
        return (
            state.clone(),
            Step {
                mutation: None,
                artifacts: Vec::new(),
            },
        );
    }

    let open_id = state
        .open_message_id
        .as_deref()
        .filter(|id| messages.iter().any(|m| m.id == *id));

    let mutation = match open_id {
        Some(id) if !digest.is_new_segment => Mutation::Amend {
            id: id.to_string(),
            content: if event.replaces_content() {
                ContentUpdate::Replace(digest.content_to_append.trim_start().to_string())
            } else {
                ContentUpdate::Append(digest.content_to_append)
            },
            function_calls: digest.function_calls,
        },
        _ => {
            let mut message = Message::assistant(backend_id, digest.content_to_append.trim_start());
            message.processed_function_calls = digest.function_calls;
            Mutation::Open(message)
        }
    };

    let next = AssemblerState {
        open_message_id: Some(mutation.message_id().to_string()),
    };
    (
        next,
        Step {
            mutation: Some(mutation),
            artifacts: digest.artifacts,
        },
    )
}

/// Outcome of feeding one event to the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Rejected by the invocation binding.
    Ignored,
    /// Nothing to show for this event.
    NoOp,
    /// The list changed; artifacts (if any) belong to `message_id`.
    Applied {
        message_id: String,
        artifacts: Vec<String>,
    },
}

/// Per-stream assembler: invocation binding plus open-message state.
#[derive(Debug, Clone)]
pub struct MessageAssembler {
    invocation: StreamInvocation,
    state: AssemblerState,
}

impl MessageAssembler {
    pub fn new(invocation: StreamInvocation) -> Self {
        Self {
            invocation,
            state: AssemblerState::default(),
        }
    }

    pub fn invocation(&self) -> &StreamInvocation {
        &self.invocation
    }

    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    /// Binds or checks the event's invocation id, then applies the event.
    pub fn handle(&mut self, event: &AgentEvent, messages: &mut Vec<Message>) -> Outcome {
        match self.invocation.admit(event.invocation_id.as_deref()) {
            Admission::Bound(id) => tracing::info!(
                "[Assembler] Received backend invocation {} (frontend {})",
                id,
                self.invocation.frontend_invocation_id
            ),
            Admission::Accepted => {}
            Admission::Rejected { expected, received } => {
                tracing::warn!(
                    expected = ?expected,
                    received = ?received,
                    frontend = %self.invocation.frontend_invocation_id,
                    "[Assembler] Event for different/unknown backend invocation ignored"
                );
                return Outcome::Ignored;
            }
        }

        let (next, step) = transition(&self.state, event, self.invocation.backend_id(), messages);
        self.state = next;

        let Some(mutation) = step.mutation else {
            tracing::debug!("[Assembler] Event carried nothing to display");
            return Outcome::NoOp;
        };

        let message_id = mutation.message_id().to_string();
        mutation.apply(messages);
        Outcome::Applied {
            message_id,
            artifacts: step.artifacts,
        }
    }
}

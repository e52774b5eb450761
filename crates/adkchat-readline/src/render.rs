//! Incremental transcript printing.
//!
//! The message store only says "something changed". [`TranscriptRenderer`]
//! remembers what has already reached the terminal and turns each new
//! snapshot into the segments still to be printed.

use std::collections::{HashMap, HashSet};

use adkchat_core::message::{Message, MessageRole};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use colored::Colorize;

const FUNCTION_CALL_PREFIX: &str = "[Function call:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Starts a message on a fresh line.
    Header(MessageRole),
    Text(MessageRole, String),
    Marker(String),
    Image { mime: String, bytes: Option<usize> },
    /// The message content was replaced rather than extended.
    Revised,
}

impl Segment {
    pub fn paint(&self) -> String {
        match self {
            Segment::Header(MessageRole::User) => format!("\n{} ", "you>".green().bold()),
            Segment::Header(MessageRole::Assistant) => format!("\n{} ", "agent>".blue().bold()),
            Segment::Header(MessageRole::System) => format!("\n{} ", "system>".yellow().bold()),
            Segment::Text(MessageRole::User, text) => text.green().to_string(),
            Segment::Text(MessageRole::Assistant, text) => text.blue().to_string(),
            Segment::Text(MessageRole::System, text) => text.yellow().to_string(),
            Segment::Marker(text) => text.magenta().to_string(),
            Segment::Image { mime, bytes } => {
                let size = bytes.map_or_else(|| "?".to_string(), |n| n.to_string());
                format!("\n{}", format!("[image: {}, {} bytes]", mime, size).cyan())
            }
            Segment::Revised => format!("\n{}", "(revised)".dimmed()),
        }
    }
}

#[derive(Debug, Default)]
struct Printed {
    shown: bool,
    content: String,
    images: usize,
}

#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    printed: HashMap<String, Printed>,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns what changed since the previous call.
    pub fn render(&mut self, messages: &[Message]) -> Vec<Segment> {
        let live: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        self.printed.retain(|id, _| live.contains(id.as_str()));

        let mut segments = Vec::new();
        for message in messages {
            let printed = self.printed.entry(message.id.clone()).or_default();
            if !printed.shown {
                printed.shown = true;
                segments.push(Segment::Header(message.role));
                push_text(&mut segments, message.role, &message.content);
            } else if let Some(delta) = message.content.strip_prefix(printed.content.as_str()) {
                push_text(&mut segments, message.role, delta);
            } else {
                segments.push(Segment::Revised);
                segments.push(Segment::Header(message.role));
                push_text(&mut segments, message.role, &message.content);
            }
            printed.content.clone_from(&message.content);

            for url in message.image_urls.iter().skip(printed.images) {
                segments.push(describe_image(url));
            }
            printed.images = message.image_urls.len();
        }
        segments
    }
}

fn push_text(segments: &mut Vec<Segment>, role: MessageRole, text: &str) {
    for piece in text.split_inclusive('\n') {
        if piece.trim_start().starts_with(FUNCTION_CALL_PREFIX) {
            segments.push(Segment::Marker(piece.to_string()));
        } else {
            segments.push(Segment::Text(role, piece.to_string()));
        }
    }
}

/// Summarises a `data:{mime};base64,{payload}` URI.
pub fn describe_image(url: &str) -> Segment {
    let parsed = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"));
    match parsed {
        Some((mime, payload)) => Segment::Image {
            mime: mime.to_string(),
            bytes: STANDARD.decode(payload).ok().map(|bytes| bytes.len()),
        },
        None => Segment::Image {
            mime: "unknown".to_string(),
            bytes: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant(id: &str, content: &str) -> Message {
        let mut message = Message::historical(Some(id.into()), MessageRole::Assistant, content);
        message.invocation_id = Some("inv".into());
        message
    }

    #[test]
    fn test_only_new_text_is_rendered() {
        let mut renderer = TranscriptRenderer::new();
        let first = renderer.render(&[assistant("a1", "Hel")]);
        assert_eq!(
            first,
            vec![
                Segment::Header(MessageRole::Assistant),
                Segment::Text(MessageRole::Assistant, "Hel".into())
            ]
        );

        let second = renderer.render(&[assistant("a1", "Hello")]);
        assert_eq!(second, vec![Segment::Text(MessageRole::Assistant, "lo".into())]);
        assert!(renderer.render(&[assistant("a1", "Hello")]).is_empty());
    }

    #[test]
    fn test_replaced_content_is_reprinted() {
        let mut renderer = TranscriptRenderer::new();
        renderer.render(&[assistant("a1", "draft")]);
        let segments = renderer.render(&[assistant("a1", "final")]);
        assert_eq!(segments[0], Segment::Revised);
        assert_eq!(segments[2], Segment::Text(MessageRole::Assistant, "final".into()));
    }

    #[test]
    fn test_function_markers_are_separate_segments() {
        let mut renderer = TranscriptRenderer::new();
        let segments = renderer.render(&[assistant("a1", "[Function call: query_db]\nrows")]);
        assert_eq!(segments[1], Segment::Marker("[Function call: query_db]\n".into()));
        assert_eq!(segments[2], Segment::Text(MessageRole::Assistant, "rows".into()));
    }

    #[test]
    fn test_images_are_summarised_once() {
        let mut renderer = TranscriptRenderer::new();
        let mut message = assistant("a1", "");
        message.image_urls.push("data:image/png;base64,iVBORw==".into());

        let segments = renderer.render(&[message.clone()]);
        assert_eq!(
            segments.last(),
            Some(&Segment::Image {
                mime: "image/png".into(),
                bytes: Some(4)
            })
        );
        assert!(renderer.render(&[message]).is_empty());
    }

    #[test]
    fn test_cleared_transcript_starts_over() {
        let mut renderer = TranscriptRenderer::new();
        renderer.render(&[assistant("a1", "old")]);
        assert!(renderer.render(&[]).is_empty());
        let segments = renderer.render(&[assistant("a1", "old")]);
        assert_eq!(segments[0], Segment::Header(MessageRole::Assistant));
    }

    #[test]
    fn test_malformed_data_uri() {
        assert_eq!(
            describe_image("https://example.com/x.png"),
            Segment::Image {
                mime: "unknown".into(),
                bytes: None
            }
        );
    }
}

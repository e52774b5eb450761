//! Image artifact discovery and payload decoding.

use adkchat_core::artifact::ArtifactPayload;
use adkchat_core::event::AgentEvent;
use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif)$").expect("static image pattern"));

static WRAPPING_QUOTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^["'](.*)["']$"#).expect("static quote pattern"));

pub fn is_image_filename(name: &str) -> bool {
    IMAGE_EXTENSION.is_match(name)
}

/// Removes one pair of surrounding `"` or `'` characters, if present.
pub fn strip_wrapping_quotes(name: &str) -> String {
    WRAPPING_QUOTES.replace(name, "$1").into_owned()
}

/// Image filenames an event references, deduplicated within the event only.
///
/// Names are returned as the backend sent them; quotes are stripped when
/// the fetch address is built.
pub fn discover_image_artifacts(event: &AgentEvent) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for name in event.referenced_filenames() {
        if !is_image_filename(name) {
            tracing::debug!("[Artifact] '{}' does not match the image pattern", name);
            continue;
        }
        if found.iter().any(|existing| existing == name) {
            continue;
        }
        found.push(name.to_string());
    }
    found
}

/// Image filenames for a history message: quote-stripped and deduplicated.
pub fn history_artifact_filenames(event: &AgentEvent) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for name in discover_image_artifacts(event) {
        let stripped = strip_wrapping_quotes(&name);
        if !found.contains(&stripped) {
            found.push(stripped);
        }
    }
    found
}

/// Converts URL-safe base64 to the standard alphabet with padding.
///
/// Lengths with remainder 1 are not valid base64; they are returned
/// unpadded with a warning instead of failing.
pub fn url_safe_to_standard_base64(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut standard: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match standard.len() % 4 {
        2 => standard.push_str("=="),
        3 => standard.push('='),
        1 => tracing::warn!(
            "[Artifact] Base64 length {} leaves remainder 1; returning unpadded",
            standard.len()
        ),
        _ => {}
    }
    standard
}

/// Builds a `data:` URI from an artifact payload.
pub fn data_uri(payload: &ArtifactPayload) -> String {
    format!(
        "data:{};base64,{}",
        payload.mime_type,
        url_safe_to_standard_base64(&payload.data)
    )
}

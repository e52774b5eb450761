//! Shared reqwest response handling.

use adkchat_core::error::{ChatError, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Response;
use serde::de::DeserializeOwned;

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes one URL path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT).to_string()
}

/// Joins a base URL and a path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub fn transport_error(err: reqwest::Error) -> ChatError {
    ChatError::transport(err.to_string())
}

/// Turns a non-2xx response into [`ChatError::Http`], keeping the body text.
pub async fn error_from_response(response: Response) -> ChatError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    ChatError::http(status, body)
}

/// Checks the status and decodes a JSON body.
pub async fn json_or_error<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment_matches_uri_component() {
        assert_eq!(encode_segment("plot 1.png"), "plot%201.png");
        assert_eq!(encode_segment("a/b?c"), "a%2Fb%3Fc");
        assert_eq!(encode_segment("keep-_.!~*'()"), "keep-_.!~*'()");
        assert_eq!(encode_segment("图.png"), "%E5%9B%BE.png");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:8000/", "/run_sse"), "http://h:8000/run_sse");
        assert_eq!(join_url("http://h/api", "users"), "http://h/api/users");
    }
}

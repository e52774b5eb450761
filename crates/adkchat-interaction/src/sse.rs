//! Incremental SSE frame decoder.
//!
//! A frame is the text before each `"\n\n"` in the accumulated buffer.
//! Only frames that start with `"data: "` are forwarded. A trailing partial
//! frame stays buffered until a later chunk completes it.
//!
//! The buffer holds raw bytes, so a chunk boundary that falls inside a
//! multi-byte UTF-8 sequence is harmless: `"\n\n"` never occurs inside one.

const DELIMITER: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data: ";

/// Splits a chunked byte stream into SSE `data:` payloads.
///
/// Not resettable; drop it and create a new one per stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a delimiter.
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a network chunk to the buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pops the next complete data frame and returns its payload.
    ///
    /// Non-data frames are consumed and skipped. Returns `None` once no
    /// complete frame remains in the buffer.
    pub fn next_payload(&mut self) -> Option<String> {
        loop {
            // A delimiter may straddle the previous scan end by one byte.
            let start = self.scanned.saturating_sub(DELIMITER.len() - 1);
            let Some(offset) = find_delimiter(&self.buffer[start..]) else {
                self.scanned = self.buffer.len();
                return None;
            };
            let boundary = start + offset;
            let frame: Vec<u8> = self.buffer.drain(..boundary + DELIMITER.len()).collect();
            self.scanned = 0;
            let text = String::from_utf8_lossy(&frame[..boundary]);

            if text.starts_with(DATA_PREFIX) {
                // "data:" is 5 bytes; the payload is trimmed like the backend's clients do.
                return Some(text[DATA_PREFIX.len() - 1..].trim().to_string());
            }

            tracing::debug!("[SSE] Skipping non-data frame ({} bytes)", boundary);
        }
    }

    /// Feeds a chunk and drains every payload it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.feed(chunk);
        std::iter::from_fn(|| self.next_payload()).collect()
    }

    /// Bytes waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "data: {\"a\":1}\n\n: keep-alive\n\ndata: {\"b\":\"é\"}\n\ndata: {\"c\":3}\n\n";

    #[test]
    fn test_basic_frames() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(STREAM.as_bytes());
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":\"é\"}", "{\"c\":3}"]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_partial_frame_is_retained() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"te").is_empty());
        assert!(decoder.push(b"xt\":\"x\"}\n").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["{\"text\":\"x\"}"]);
    }

    #[test]
    fn test_any_chunking_yields_same_frames() {
        let bytes = STREAM.as_bytes();
        let mut whole = FrameDecoder::new();
        let expected = whole.push(bytes);

        for size in 1..=bytes.len() {
            let mut decoder = FrameDecoder::new();
            let mut got = Vec::new();
            for chunk in bytes.chunks(size) {
                got.extend(decoder.push(chunk));
            }
            assert_eq!(got, expected, "chunk size {}", size);
        }

        // Every single split point, including inside the two-byte 'é'.
        for split in 0..=bytes.len() {
            let mut decoder = FrameDecoder::new();
            let mut got = decoder.push(&bytes[..split]);
            got.extend(decoder.push(&bytes[split..]));
            assert_eq!(got, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_non_data_prefix_dropped() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b"event: ping\n\ndata:{\"no_space\":1}\n\ndata: ok\n\n");
        assert_eq!(payloads, vec!["ok"]);
    }

    #[test]
    fn test_large_frame_in_small_chunks() {
        let body = "A".repeat(8 * 1024 * 1024);
        let stream = format!("data: {{\"inlineData\":\"{}\"}}\n\ndata: next\n\n", body);
        let bytes = stream.as_bytes();

        let mut decoder = FrameDecoder::new();
        let mut got = Vec::new();
        for chunk in bytes.chunks(4096) {
            let before = decoder.pending();
            got.extend(decoder.push(chunk));
            // Only the new bytes (plus one) are searched for each chunk.
            if got.is_empty() {
                assert_eq!(decoder.scanned, before + chunk.len());
            }
        }

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].len(), body.len() + "{\"inlineData\":\"\"}".len());
        assert_eq!(got[1], "next");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_delimiter_split_across_chunks_after_scan() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: abc\n").is_empty());
        assert_eq!(decoder.scanned, "data: abc\n".len());
        assert_eq!(decoder.push(b"\ndata: d"), vec!["abc"]);
        assert_eq!(decoder.push(b"\n\n"), vec!["d"]);
    }

    #[test]
    fn test_unterminated_tail_not_emitted() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b"data: one\n\ndata: two");
        assert_eq!(payloads, vec!["one"]);
        assert_eq!(decoder.pending(), "data: two".len());
    }
}

//! SSE stream decoding.
//!
//! Provides [`SseDecoder`] for line-buffered extraction of `data:` payloads
//! from server-sent event streams, and [`relay_text`] which turns an upstream
//! SSE response into a stream of text deltas. Handles TCP chunk boundary
//! reassembly correctly.

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;

use super::TextStream;
use crate::error::{Error, Result};

/// Maximum bytes buffered while waiting for a line terminator.
const MAX_LINE_BUFFER: usize = 64 * 1024;

/// Line buffer that yields complete `data:` payloads.
///
/// Buffers raw bytes across chunk boundaries so multi-byte UTF-8 sequences and
/// JSON payloads split by the transport are reassembled before parsing.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning payloads of every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = parse_line(&line) {
                payloads.push(data);
            }
        }

        if self.buffer.len() > MAX_LINE_BUFFER {
            tracing::warn!(
                buffered = self.buffer.len(),
                "SSE line exceeded buffer limit, discarding"
            );
            self.buffer.clear();
        }

        payloads
    }

    /// Flush a trailing line that arrived without a terminator.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }
}

/// Extract the payload of a single `data:` line, if it is one.
fn parse_line(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    (!data.is_empty()).then(|| data.to_string())
}

struct RelayState<F> {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
    extract: F,
}

/// Relay an SSE response as text, in arrival order.
///
/// `extract` maps each payload to the text it carries (`Ok(None)` for events
/// without text). An `Err` from `extract` or the transport ends the stream
/// after yielding that error.
pub fn relay_text<F>(response: reqwest::Response, extract: F) -> TextStream
where
    F: FnMut(&str) -> Result<Option<String>> + Send + 'static,
{
    let state = RelayState {
        bytes: response.bytes_stream().boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
        extract,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                match (state.extract)(&payload) {
                    Ok(Some(text)) if !text.is_empty() => return Some((Ok(text), state)),
                    Ok(_) => continue,
                    Err(e) => {
                        state.pending.clear();
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.push(&chunk);
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(Error::Upstream(e)), state));
                }
                None => {
                    state.finished = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build SSE data from event lines, then split at the given byte positions.
    fn split_sse_at_positions(events: &[&str], split_positions: &[usize]) -> Vec<Vec<u8>> {
        let full: Vec<u8> = events
            .iter()
            .flat_map(|e| format!("{}\n\n", e).into_bytes())
            .collect();

        let mut chunks = Vec::new();
        let mut prev = 0;
        for &pos in split_positions {
            if pos > prev && pos < full.len() {
                chunks.push(full[prev..pos].to_vec());
                prev = pos;
            }
        }
        chunks.push(full[prev..].to_vec());
        chunks
    }

    fn response_from_chunks(chunks: Vec<Vec<u8>>) -> reqwest::Response {
        let body = reqwest::Body::wrap_stream(stream::iter(
            chunks.into_iter().map(Ok::<_, std::io::Error>),
        ));
        reqwest::Response::from(http::Response::new(body))
    }

    #[test]
    fn test_single_chunk() {
        let chunks = split_sse_at_positions(&["event: ping", "data: one", "data:two"], &[]);
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(&chunks[0]), vec!["one", "two"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_payload_split_across_chunks() {
        let events = [r#"data: {"type":"response.output_text.delta","delta":"Hello"}"#];
        let chunks = split_sse_at_positions(&events, &[7, 20, 40]);
        assert!(chunks.len() > 1);

        let mut decoder = SseDecoder::new();
        let mut payloads = Vec::new();
        for chunk in &chunks {
            payloads.extend(decoder.push(chunk));
        }
        assert_eq!(
            payloads,
            vec![r#"{"type":"response.output_text.delta","delta":"Hello"}"#]
        );
    }

    #[test]
    fn test_multibyte_utf8_split() {
        let full = "data: héllo wörld\n\n".as_bytes().to_vec();
        // Split inside the two-byte 'é'
        let (a, b) = full.split_at(8);
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(a).is_empty());
        assert_eq!(decoder.push(b), vec!["héllo wörld"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"data: a\r\n\r\ndata: b\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_trailing_line_flushed_on_finish() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("[DONE]"));
    }

    #[test]
    fn test_oversized_line_discarded() {
        let mut decoder = SseDecoder::new();
        let junk = vec![b'x'; MAX_LINE_BUFFER + 1];
        assert!(decoder.push(&junk).is_empty());
        assert_eq!(decoder.push(b"\ndata: ok\n"), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_relay_preserves_order_and_skips_empty() {
        let events = ["data: a", "data: ", "data: skip", "data: b", "data: c"];
        let chunks = split_sse_at_positions(&events, &[3, 11, 30]);
        let response = response_from_chunks(chunks);

        let stream = relay_text(response, |payload| {
            Ok((payload != "skip").then(|| payload.to_string()))
        });
        let items: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_relay_stops_after_extract_error() {
        let chunks = split_sse_at_positions(&["data: a", "data: boom", "data: c"], &[]);
        let response = response_from_chunks(chunks);

        let stream = relay_text(response, |payload| {
            if payload == "boom" {
                Err(Error::Provider("upstream failed".to_string()))
            } else {
                Ok(Some(payload.to_string()))
            }
        });
        let items: Vec<Result<String>> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(items[1]
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("upstream failed"));
    }
}

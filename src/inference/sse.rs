//! Server-sent event decoding for streaming chat completions
//!
//! llama-server emits one `data: {json}` line per token batch and a final
//! `data: [DONE]`. [`delta_stream`] turns the raw byte stream of such a
//! response into a stream of text deltas:
//!
//! - lines without a `data:` prefix are ignored
//! - `[DONE]` ends the stream
//! - a payload that is not valid chunk JSON is logged and skipped
//! - a read error is yielded once as `Err` and ends the stream
//!
//! Bytes are split on `\n` before UTF-8 decoding, so multi-byte characters
//! that straddle network chunks decode correctly.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use metrics::increment_counter;

use crate::error::ChatError;
use crate::inference::types::ChatCompletionChunk;
use crate::inference::DeltaStream;

const DONE_MARKER: &str = "[DONE]";

/// Classification of one SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// A text delta to forward
    Delta(String),
    /// The end-of-stream marker
    Done,
    /// Anything that carries no text
    Skip,
}

/// Classify a single line of an SSE body
///
/// # Examples
///
/// ```
/// use localchat::inference::sse::{decode_line, SseLine};
///
/// let line = r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#;
/// assert_eq!(decode_line(line), SseLine::Delta("Hi".to_string()));
/// assert_eq!(decode_line("data: [DONE]"), SseLine::Done);
/// assert_eq!(decode_line(": keep-alive"), SseLine::Skip);
/// ```
pub fn decode_line(line: &str) -> SseLine {
    let line = line.trim_end_matches('\r');
    let Some(payload) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let payload = payload.trim();

    if payload == DONE_MARKER {
        return SseLine::Done;
    }
    if payload.is_empty() {
        return SseLine::Skip;
    }

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => match chunk.delta_text() {
            Some(text) => SseLine::Delta(text.to_string()),
            None => SseLine::Skip,
        },
        Err(e) => {
            increment_counter!("stream_malformed_chunks_total");
            tracing::warn!("Skipping malformed stream chunk: {} (payload: {})", e, payload);
            SseLine::Skip
        }
    }
}

struct DecoderState<S> {
    bytes: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> DecoderState<S> {
    /// Decode every complete line in the buffer. Returns true on `[DONE]`.
    fn drain_lines(&mut self) -> bool {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.push_line(&line[..line.len() - 1]) {
                return true;
            }
        }
        false
    }

    fn push_line(&mut self, raw: &[u8]) -> bool {
        match decode_line(&String::from_utf8_lossy(raw)) {
            SseLine::Delta(text) => {
                self.pending.push_back(text);
                false
            }
            SseLine::Done => true,
            SseLine::Skip => false,
        }
    }
}

/// Turn an SSE response body into a stream of text deltas
///
/// # Arguments
///
/// * `bytes` - Raw response body chunks
///
/// # Returns
///
/// A [`DeltaStream`] that ends on `[DONE]`, at end of body, or after
/// yielding a single transport error.
pub fn delta_stream<S, E>(bytes: S) -> DeltaStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecoderState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    if state.drain_lines() {
                        state.finished = true;
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.clear();
                    let err = ChatError::Transport(format!("stream read failed: {}", e));
                    return Some((Err(err.into()), state));
                }
                None => {
                    state.finished = true;
                    if !state.buffer.is_empty() {
                        let rest = std::mem::take(&mut state.buffer);
                        state.push_line(&rest);
                    }
                }
            }
        }
    }))
}

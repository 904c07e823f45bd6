//! Server-Sent Events parser for OpenAI-style streaming chat completions.
//!
//! The upstream body is a sequence of `data: <json>` events separated by a blank
//! line and terminated by `data: [DONE]`. Each JSON payload carries one delta in
//! `choices[0].delta.content`.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use refundlens_abstraction::ModelError;
use serde::Deserialize;
use tracing::debug;

/// What a single SSE event means to the delta stream.
#[derive(Debug, PartialEq)]
enum SseEvent {
    /// A text delta (possibly empty).
    Delta(String),
    /// The `[DONE]` terminator.
    Done,
    /// The server reported an error inside the stream.
    Error(ModelError),
    /// Comments, keep-alives, role-only chunks and unparseable payloads.
    Skip,
}

/// Streaming response parser yielding one item per text delta.
///
/// The parser owns the upstream byte stream, so dropping it closes the
/// underlying HTTP response.
pub(crate) struct SseDeltaStream<S> {
    inner: S,
    buffer: Vec<u8>,
    done: bool,
}

impl<S> SseDeltaStream<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self { inner, buffer: Vec::new(), done: false }
    }

    /// Removes the next complete event (terminated by a blank line) from the buffer.
    fn take_event(&mut self) -> Option<String> {
        let end = self.buffer.windows(2).position(|w| w == b"\n\n")?;
        let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
        Some(String::from_utf8_lossy(&event[..end]).into_owned())
    }
}

impl<S, E> Stream for SseDeltaStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<String, ModelError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }

            // Drain events already buffered before asking the network for more
            while let Some(event) = self.take_event() {
                match parse_event(&event) {
                    SseEvent::Delta(text) => return Poll::Ready(Some(Ok(text))),
                    SseEvent::Done => {
                        self.done = true;
                        return Poll::Ready(None);
                    }
                    SseEvent::Error(e) => {
                        self.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    SseEvent::Skip => {}
                }
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    // CRLF framing is legal SSE; normalize to LF
                    self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(ModelError::RequestError(format!(
                        "Stream error: {}",
                        e
                    )))));
                }
                Poll::Ready(None) => {
                    // Upstream closed without [DONE]; a trailing event may lack its blank line
                    self.done = true;
                    let rest = String::from_utf8_lossy(&self.buffer).into_owned();
                    self.buffer.clear();
                    return match parse_event(rest.trim_end()) {
                        SseEvent::Delta(text) => Poll::Ready(Some(Ok(text))),
                        SseEvent::Error(e) => Poll::Ready(Some(Err(e))),
                        SseEvent::Done | SseEvent::Skip => Poll::Ready(None),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Interprets one raw SSE event block.
fn parse_event(event: &str) -> SseEvent {
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();
    if data.is_empty() {
        return SseEvent::Skip;
    }
    let data = data.join("\n");

    if data.trim() == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<StreamingChunk>(&data) {
        Ok(StreamingChunk { error: Some(err), .. }) => {
            SseEvent::Error(ModelError::ModelResponseError(err.message))
        }
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .map_or(SseEvent::Skip, SseEvent::Delta),
        Err(e) => {
            // Some servers interleave non-JSON keep-alive payloads
            debug!(error = %e, "Failed to parse SSE chunk");
            SseEvent::Skip
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamingChunk {
    #[serde(default)]
    choices: Vec<StreamingChoice>,
    #[serde(default)]
    error: Option<StreamingError>,
}

#[derive(Debug, Deserialize)]
struct StreamingChoice {
    delta: StreamingDelta,
}

#[derive(Debug, Deserialize)]
struct StreamingDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamingError {
    message: String,
}

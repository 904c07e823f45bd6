//! Outbound stream events and their Server-Sent Events framing.

use bytes::Bytes;

/// Text of the terminating event.
pub const DONE_MARKER: &str = "[DONE]";

/// Fixed progress messages sent before any explanation text.
pub const PROGRESS_MESSAGES: [&str; 3] = [
    "🔍 Analyzing your return...",
    "📊 Checking IRS processing times...",
    "🤖 Generating personalized explanation...",
];

/// One event on an explanation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A progress notice or a chunk of explanation text.
    Message(String),
    /// End of stream.
    Done,
}

impl StreamEvent {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    /// The text carried by the event; the sentinel carries `[DONE]`.
    pub fn text(&self) -> &str {
        match self {
            Self::Message(text) => text,
            Self::Done => DONE_MARKER,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Encodes the event as one SSE frame. Multi-line text becomes several
    /// `data:` lines of the same event.
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Done => Bytes::from_static(b"data: [DONE]\n\n"),
            Self::Message(text) => {
                let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
                let mut frame = String::with_capacity(normalized.len() + 8);
                for line in normalized.split('\n') {
                    frame.push_str("data: ");
                    frame.push_str(line);
                    frame.push('\n');
                }
                frame.push('\n');
                Bytes::from(frame)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_line() {
        assert_eq!(StreamEvent::message("hello").encode(), Bytes::from_static(b"data: hello\n\n"));
    }

    #[test]
    fn test_encode_done() {
        assert_eq!(StreamEvent::Done.encode(), Bytes::from_static(b"data: [DONE]\n\n"));
        assert_eq!(StreamEvent::Done.text(), DONE_MARKER);
    }

    #[test]
    fn test_encode_multi_line() {
        assert_eq!(
            StreamEvent::message("first\nsecond\r\nthird").encode(),
            Bytes::from_static(b"data: first\ndata: second\ndata: third\n\n")
        );
    }

    #[test]
    fn test_encode_empty_text() {
        assert_eq!(StreamEvent::message("").encode(), Bytes::from_static(b"data: \n\n"));
    }

    #[test]
    fn test_unicode_survives() {
        let frame = StreamEvent::message(PROGRESS_MESSAGES[0]).encode();
        assert_eq!(std::str::from_utf8(&frame).unwrap(), "data: 🔍 Analyzing your return...\n\n");
    }
}

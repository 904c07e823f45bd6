//! Destinations for explanation stream events.

use std::convert::Infallible;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::SinkClosed;
use crate::event::StreamEvent;

/// Body stream of encoded SSE frames.
pub type SseBody = BoxStream<'static, Result<Bytes, Infallible>>;

/// One-way, ordered event channel to a client.
///
/// `emit` returns once the event has been handed to the consumer, so every
/// event is flushed before the next is produced.
#[async_trait]
pub trait EventSink: Send {
    /// Delivers one event.
    ///
    /// # Errors
    /// Returns `SinkClosed` once the consumer is gone.
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed>;
}

/// Sink that encodes events as SSE frames into a bounded channel.
#[derive(Debug, Clone)]
pub struct SseSink {
    tx: mpsc::Sender<Bytes>,
}

impl SseSink {
    /// Creates a sink and the body stream that drains it. The channel holds at
    /// most one frame, so the producer runs at most one event ahead of the client.
    pub fn channel() -> (Self, SseBody) {
        let (tx, rx) = mpsc::channel(1);
        let body = ReceiverStream::new(rx).map(Ok::<_, Infallible>).boxed();
        (Self { tx }, body)
    }
}

#[async_trait]
impl EventSink for SseSink {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        self.tx.send(event.encode()).await.map_err(|_| SinkClosed)
    }
}

/// Sink that keeps every event in memory, optionally closing after a fixed
/// number of deliveries to simulate a client that disconnects.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<StreamEvent>,
    close_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that accepts `count` events and then reports itself closed.
    pub fn closing_after(count: usize) -> Self {
        Self { events: Vec::new(), close_after: Some(count) }
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// Texts of all recorded events, sentinel included.
    pub fn texts(&self) -> Vec<&str> {
        self.events.iter().map(StreamEvent::text).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        if self.close_after.is_some_and(|limit| self.events.len() >= limit) {
            return Err(SinkClosed);
        }
        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sse_sink_delivers_frames_in_order() {
        let (mut sink, mut body) = SseSink::channel();
        let producer = tokio::spawn(async move {
            sink.emit(StreamEvent::message("one")).await.unwrap();
            sink.emit(StreamEvent::Done).await.unwrap();
        });

        assert_eq!(body.next().await, Some(Ok(Bytes::from_static(b"data: one\n\n"))));
        assert_eq!(body.next().await, Some(Ok(Bytes::from_static(b"data: [DONE]\n\n"))));
        producer.await.unwrap();
        assert_eq!(body.next().await, None);
    }

    #[tokio::test]
    async fn test_sse_sink_reports_closed_consumer() {
        let (mut sink, body) = SseSink::channel();
        drop(body);
        assert_eq!(sink.emit(StreamEvent::message("lost")).await, Err(SinkClosed));
    }

    #[tokio::test]
    async fn test_recording_sink_closes_after_limit() {
        let mut sink = RecordingSink::closing_after(1);
        assert!(sink.emit(StreamEvent::message("a")).await.is_ok());
        assert_eq!(sink.emit(StreamEvent::message("b")).await, Err(SinkClosed));
        assert_eq!(sink.texts(), vec!["a"]);
    }
}

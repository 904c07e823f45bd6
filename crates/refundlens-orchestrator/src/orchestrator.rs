//! Explanation stream orchestration.
//!
//! One run emits the fixed progress events, looks up the filing, delegates to
//! the selected generator and terminates the stream with a single sentinel.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use refundlens_core::{FilingLookup, FilingStatusSnapshot, LookupError, PacingConfig};
use tracing::{Instrument, debug, error, info_span, warn};

use crate::error::{GenerationError, SinkClosed};
use crate::event::{DONE_MARKER, PROGRESS_MESSAGES, StreamEvent};
use crate::generators::{ExplanationGenerator, GenerationMode};
use crate::mode::ModeSelector;
use crate::request::ExplanationRequest;
use crate::sink::{EventSink, SseBody, SseSink};

/// Chunk sent in place of the explanation when a generator fails.
pub const GENERATION_ERROR_MESSAGE: &str =
    "Sorry, something went wrong while preparing your explanation. Please try again.";

/// Presentation pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pacing {
    /// Pause after each progress event.
    pub progress_delay: Duration,
    /// Pause between demo chunks.
    pub demo_chunk_delay: Duration,
}

impl Pacing {
    /// No pauses at all.
    pub const fn none() -> Self {
        Self { progress_delay: Duration::ZERO, demo_chunk_delay: Duration::ZERO }
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        Self { progress_delay: config.progress_delay(), demo_chunk_delay: config.demo_chunk_delay() }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The sentinel was delivered.
    Completed,
    /// The client went away before the sentinel.
    ClientDisconnected,
}

enum ForwardError {
    Sink(SinkClosed),
    Generation(GenerationError),
}

/// Drives one explanation stream per request.
#[derive(Clone)]
pub struct ExplanationOrchestrator {
    lookup: Arc<dyn FilingLookup>,
    modes: ModeSelector,
    pacing: Pacing,
}

impl std::fmt::Debug for ExplanationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplanationOrchestrator")
            .field("modes", &self.modes)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl ExplanationOrchestrator {
    pub fn new(lookup: Arc<dyn FilingLookup>, modes: ModeSelector, pacing: Pacing) -> Self {
        Self { lookup, modes, pacing }
    }

    pub fn mode(&self) -> GenerationMode {
        self.modes.mode()
    }

    /// Runs the request on a new task and returns the SSE body it feeds.
    /// Dropping the body stops the task at its next event.
    pub fn stream_sse(self: &Arc<Self>, request: ExplanationRequest) -> SseBody {
        let (mut sink, body) = SseSink::channel();
        let orchestrator = Arc::clone(self);
        let span = info_span!("explain", filing_id = request.filing_id().unwrap_or("-"));
        tokio::spawn(
            async move {
                orchestrator.run(&request, &mut sink).await;
            }
            .instrument(span),
        );
        body
    }

    /// Streams the explanation for `request` into `sink`. Never fails: every
    /// problem after the first event is turned into stream content.
    pub async fn run<S>(&self, request: &ExplanationRequest, sink: &mut S) -> StreamOutcome
    where
        S: EventSink + ?Sized,
    {
        match self.stream(request, sink).await {
            Ok(()) => StreamOutcome::Completed,
            Err(SinkClosed) => {
                debug!("Client disconnected, explanation stream stopped");
                StreamOutcome::ClientDisconnected
            }
        }
    }

    async fn stream<S>(&self, request: &ExplanationRequest, sink: &mut S) -> Result<(), SinkClosed>
    where
        S: EventSink + ?Sized,
    {
        let mut snapshot = None;
        for (index, message) in PROGRESS_MESSAGES.iter().enumerate() {
            sink.emit(StreamEvent::message(*message)).await?;
            if index == 0 {
                let (found, ()) = tokio::join!(self.lookup_snapshot(request), self.pause());
                snapshot = found;
            } else {
                self.pause().await;
            }
        }

        let generator = self.modes.select();
        if generator.mode() == GenerationMode::Demo {
            warn!("No AI credential configured, using demo mode");
        }

        let forwarding =
            Self::forward(generator.as_ref(), request, snapshot.as_ref(), &mut *sink);
        let forwarded = AssertUnwindSafe(forwarding).catch_unwind().await;

        let failure = match forwarded {
            Ok(Ok(())) => None,
            Ok(Err(ForwardError::Sink(closed))) => return Err(closed),
            Ok(Err(ForwardError::Generation(e))) => Some(e),
            Err(panic) => Some(GenerationError::Panicked(panic_message(panic.as_ref()))),
        };
        if let Some(e) = failure {
            error!(mode = generator.mode().as_str(), error = %e, "Explanation generation failed");
            sink.emit(StreamEvent::message(GENERATION_ERROR_MESSAGE)).await?;
        }

        sink.emit(StreamEvent::Done).await
    }

    async fn forward<S>(
        generator: &dyn ExplanationGenerator,
        request: &ExplanationRequest,
        snapshot: Option<&FilingStatusSnapshot>,
        sink: &mut S,
    ) -> Result<(), ForwardError>
    where
        S: EventSink + ?Sized,
    {
        let mut chunks = generator.generate(request.question(), snapshot).await;
        while let Some(item) = chunks.next().await {
            let text = item.map_err(ForwardError::Generation)?;
            if text.trim() == DONE_MARKER {
                debug!("Dropping chunk that matches the end marker");
                continue;
            }
            sink.emit(StreamEvent::Message(text)).await.map_err(ForwardError::Sink)?;
        }
        Ok(())
    }

    async fn lookup_snapshot(&self, request: &ExplanationRequest) -> Option<FilingStatusSnapshot> {
        let filing_id = request.filing_id()?;
        match self.lookup.fetch_status(filing_id).await {
            Ok(snapshot) => Some(snapshot),
            Err(LookupError::NotFound(_)) => {
                warn!(filing_id = %filing_id, "Filing not found, explaining without context");
                None
            }
            Err(e) => {
                error!(filing_id = %filing_id, error = %e, "Filing lookup failed, explaining without context");
                None
            }
        }
    }

    async fn pause(&self) {
        if !self.pacing.progress_delay.is_zero() {
            tokio::time::sleep(self.pacing.progress_delay).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

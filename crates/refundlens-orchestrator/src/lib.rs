//! Explanation streaming for refundlens.
//!
//! Turns an [`ExplanationRequest`] into an ordered stream of [`StreamEvent`]s:
//! three progress notices, the explanation chunks from the generator picked by
//! [`ModeSelector`], and a single `[DONE]` sentinel.

pub mod error;
pub mod event;
pub mod generators;
pub mod mode;
pub mod orchestrator;
pub mod request;
pub mod sink;

pub use error::{GenerationError, SinkClosed};
pub use event::{DONE_MARKER, PROGRESS_MESSAGES, StreamEvent};
pub use generators::{
    AiGenerator, ChunkStream, DemoGenerator, ExplanationGenerator, GenerationMode,
};
pub use mode::ModeSelector;
pub use orchestrator::{ExplanationOrchestrator, GENERATION_ERROR_MESSAGE, Pacing, StreamOutcome};
pub use request::{DEFAULT_QUESTION, ExplanationRequest};
pub use sink::{EventSink, RecordingSink, SseBody, SseSink};

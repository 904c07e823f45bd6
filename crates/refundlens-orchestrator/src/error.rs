//! Error types for the explanation pipeline.

use refundlens_abstraction::ModelError;
use thiserror::Error;

/// Failure reported by an explanation generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The language-model backend failed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// The generator panicked while producing chunks.
    #[error("generator panicked: {0}")]
    Panicked(String),

    /// Any other generator-specific failure.
    #[error("{0}")]
    Other(String),
}

/// The consumer of an event stream went away; nothing more can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

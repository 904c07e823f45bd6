//! Explanation generators: the deterministic demo script and the live
//! chat-completion adapter.

pub mod ai;
pub mod demo;

use async_trait::async_trait;
use futures::stream::BoxStream;
use refundlens_core::FilingStatusSnapshot;

use crate::error::GenerationError;

pub use ai::AiGenerator;
pub use demo::DemoGenerator;

/// Lazily produced explanation chunks. Dropping the stream releases any
/// resource behind it.
pub type ChunkStream = BoxStream<'static, Result<String, GenerationError>>;

/// Which strategy produced an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Demo,
    Ai,
}

impl GenerationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Ai => "ai",
        }
    }
}

/// Produces the explanation text for one request.
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    fn mode(&self) -> GenerationMode;

    /// Starts generating an answer to `question`, using `snapshot` as context when present.
    async fn generate(&self, question: &str, snapshot: Option<&FilingStatusSnapshot>) -> ChunkStream;
}

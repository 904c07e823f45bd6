//! Scripted explanation used when no AI credential is configured.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use refundlens_core::FilingStatusSnapshot;

use super::{ChunkStream, ExplanationGenerator, GenerationMode};

const INTRO: &str =
    "Based on your filing information, your refund is taking a little longer than usual.";
const PROFILE_NOTE: &str = "This is common for returns with your profile characteristics.";
const GENERIC_REMARK: &str =
    "High-income filers and early submissions are often reviewed more carefully.";

/// Deterministic three-chunk explanation.
#[derive(Debug, Clone, Default)]
pub struct DemoGenerator {
    chunk_delay: Duration,
}

impl DemoGenerator {
    /// `chunk_delay` is the pause between consecutive chunks.
    pub fn new(chunk_delay: Duration) -> Self {
        Self { chunk_delay }
    }

    /// The chunks for `snapshot`, identical across calls for equal snapshots.
    pub fn chunks(snapshot: Option<&FilingStatusSnapshot>) -> Vec<String> {
        let detail = snapshot.map_or_else(
            || GENERIC_REMARK.to_string(),
            |s| {
                format!(
                    "Your return (status: {}) has a confidence score of {}% for the estimated date.",
                    s.status(),
                    s.confidence_percent()
                )
            },
        );
        vec![INTRO.to_string(), PROFILE_NOTE.to_string(), detail]
    }
}

#[async_trait]
impl ExplanationGenerator for DemoGenerator {
    fn mode(&self) -> GenerationMode {
        GenerationMode::Demo
    }

    async fn generate(&self, _question: &str, snapshot: Option<&FilingStatusSnapshot>) -> ChunkStream {
        let delay = self.chunk_delay;
        stream::iter(Self::chunks(snapshot).into_iter().enumerate())
            .then(move |(index, chunk)| async move {
                if index > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use refundlens_core::FilingStatus;

    #[test]
    fn test_chunks_with_snapshot() {
        let snapshot = FilingStatusSnapshot::new(FilingStatus::Approved, 0.94);
        let chunks = DemoGenerator::chunks(Some(&snapshot));
        assert_eq!(
            chunks,
            vec![
                INTRO.to_string(),
                PROFILE_NOTE.to_string(),
                "Your return (status: APPROVED) has a confidence score of 94% for the estimated date."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_chunks_round_halfway_confidence_to_even() {
        let snapshot = FilingStatusSnapshot::new(FilingStatus::Approved, 0.625);
        assert_eq!(
            DemoGenerator::chunks(Some(&snapshot))[2],
            "Your return (status: APPROVED) has a confidence score of 62% for the estimated date."
        );
    }

    #[test]
    fn test_chunks_without_snapshot() {
        assert_eq!(DemoGenerator::chunks(None)[2], GENERIC_REMARK);
    }

    #[test]
    fn test_chunks_are_idempotent() {
        let snapshot = FilingStatusSnapshot::new(FilingStatus::Review, 0.615);
        assert_eq!(DemoGenerator::chunks(Some(&snapshot)), DemoGenerator::chunks(Some(&snapshot)));
        assert_eq!(DemoGenerator::chunks(None), DemoGenerator::chunks(None));
    }

    #[tokio::test]
    async fn test_generate_streams_all_chunks() {
        let generator = DemoGenerator::new(Duration::ZERO);
        let items: Vec<_> = generator.generate("ignored", None).await.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(Result::is_ok));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_pauses_between_chunks() {
        let generator = DemoGenerator::new(Duration::from_millis(400));
        let started = tokio::time::Instant::now();
        let items: Vec<_> = generator.generate("ignored", None).await.collect().await;
        assert_eq!(items.len(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(800) && elapsed < Duration::from_millis(1200));
    }
}

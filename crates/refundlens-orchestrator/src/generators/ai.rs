//! Explanation generator backed by a streaming chat-completion model.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::future;
use futures::stream;
use refundlens_abstraction::{ChatMessage, ModelParameters, StreamingModel};
use refundlens_core::FilingStatusSnapshot;
use tracing::{debug, error};

use super::{ChunkStream, ExplanationGenerator, GenerationMode};

/// Instruction sent as the system message of every completion.
pub const SYSTEM_PROMPT: &str = "You are a helpful tax assistant explaining refund delays. Be concise, friendly, and provide actionable information. Keep responses under 100 words.";

/// The single chunk sent when the completion stream cannot be opened.
pub const CONNECT_ERROR_MESSAGE: &str = "Error connecting to AI service. Please try again.";

/// Streams a live answer from a chat-completion model.
pub struct AiGenerator {
    model: Arc<dyn StreamingModel>,
    max_tokens: u32,
}

impl std::fmt::Debug for AiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGenerator")
            .field("model_id", &self.model.model_id())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AiGenerator {
    pub fn new(model: Arc<dyn StreamingModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    /// The user message: the question, followed by a context block when a
    /// snapshot is available.
    pub fn user_prompt(question: &str, snapshot: Option<&FilingStatusSnapshot>) -> String {
        let mut prompt = question.to_string();
        if let Some(snapshot) = snapshot {
            let _ = write!(
                prompt,
                "\n\nReturn Context:\n- Status: {}\n- Confidence: {}%\n- History: {} status changes",
                snapshot.status(),
                snapshot.confidence_percent(),
                snapshot.history_len()
            );
            if let Some(date) = snapshot.estimated_date() {
                let _ = write!(prompt, "\n- Estimated Date: {}", date.format("%b %-d, %Y"));
            }
        }
        prompt
    }

    pub fn messages(question: &str, snapshot: Option<&FilingStatusSnapshot>) -> Vec<ChatMessage> {
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(Self::user_prompt(question, snapshot))]
    }
}

#[async_trait]
impl ExplanationGenerator for AiGenerator {
    fn mode(&self) -> GenerationMode {
        GenerationMode::Ai
    }

    async fn generate(&self, question: &str, snapshot: Option<&FilingStatusSnapshot>) -> ChunkStream {
        let messages = Self::messages(question, snapshot);
        let parameters = ModelParameters::with_max_tokens(self.max_tokens);
        let model_id = self.model.model_id().to_string();

        let deltas = match self.model.stream_chat_completion(&messages, Some(parameters)).await {
            Ok(deltas) => deltas,
            Err(e) => {
                error!(model_id = %model_id, error = %e, "Failed to open AI completion stream");
                return stream::once(future::ready(Ok(CONNECT_ERROR_MESSAGE.to_string()))).boxed();
            }
        };
        debug!(model_id = %model_id, "AI completion stream opened");

        // A mid-stream failure ends the answer; whatever was already sent stands.
        deltas
            .take_while(move |item| {
                if let Err(e) = item {
                    error!(model_id = %model_id, error = %e, "AI completion stream failed");
                }
                future::ready(item.is_ok())
            })
            .filter_map(|item| future::ready(item.ok().filter(|text| !text.is_empty()).map(Ok)))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use refundlens_abstraction::{ChatRole, ModelError};
    use refundlens_core::FilingStatus;
    use refundlens_models::{ScriptStep, ScriptedModel};

    fn snapshot() -> FilingStatusSnapshot {
        FilingStatusSnapshot::new(FilingStatus::Approved, 0.94)
            .with_estimated_date(NaiveDate::from_ymd_opt(2026, 10, 26))
            .with_history_len(2)
    }

    #[test]
    fn test_user_prompt_without_snapshot_is_the_question() {
        assert_eq!(AiGenerator::user_prompt("Why?", None), "Why?");
    }

    #[test]
    fn test_user_prompt_with_context() {
        assert_eq!(
            AiGenerator::user_prompt("Why?", Some(&snapshot())),
            "Why?\n\nReturn Context:\n- Status: APPROVED\n- Confidence: 94%\n- History: 2 status changes\n- Estimated Date: Oct 26, 2026"
        );
    }

    #[test]
    fn test_user_prompt_omits_missing_date() {
        let snapshot = FilingStatusSnapshot::new(FilingStatus::Filed, 0.5).with_history_len(1);
        let prompt = AiGenerator::user_prompt("Why?", Some(&snapshot));
        assert!(prompt.ends_with("- History: 1 status changes"));
        assert!(!prompt.contains("Estimated Date"));
    }

    #[test]
    fn test_single_digit_day_is_not_padded() {
        let snapshot = snapshot().with_estimated_date(NaiveDate::from_ymd_opt(2027, 1, 2));
        assert!(AiGenerator::user_prompt("q", Some(&snapshot)).ends_with("Jan 2, 2027"));
    }

    #[tokio::test]
    async fn test_forwards_non_empty_deltas() {
        let model = Arc::new(ScriptedModel::with_deltas("scripted", &["Hello", "", " world"]));
        let generator = AiGenerator::new(model.clone(), 200);

        let items: Vec<_> = generator.generate("Why?", Some(&snapshot())).await.collect().await;
        assert_eq!(items, vec![Ok("Hello".to_string()), Ok(" world".to_string())]);

        let sent = model.last_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, ChatRole::System);
        assert_eq!(sent[0].content, SYSTEM_PROMPT);
        assert!(sent[1].content.contains("Confidence: 94%"));
        assert_eq!(model.released(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_yields_one_error_chunk() {
        let model = Arc::new(ScriptedModel::failing_to_open(
            "scripted",
            ModelError::AuthenticationError("bad key".into()),
        ));
        let generator = AiGenerator::new(model, 200);

        let items: Vec<_> = generator.generate("Why?", None).await.collect().await;
        assert_eq!(items, vec![Ok(CONNECT_ERROR_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_stops_quietly() {
        let model = Arc::new(ScriptedModel::new(
            "scripted",
            vec![
                ScriptStep::Delta("Partial".into()),
                ScriptStep::Fail(ModelError::RequestError("reset".into())),
                ScriptStep::Delta("never".into()),
            ],
        ));
        let generator = AiGenerator::new(model.clone(), 200);

        let items: Vec<_> = generator.generate("Why?", None).await.collect().await;
        assert_eq!(items, vec![Ok("Partial".to_string())]);
        assert_eq!(model.released(), 1);
    }
}

//! Model implementations for refundlens.
//!
//! This crate provides concrete implementations of the `StreamingModel` trait.
//!
//! # Supported Providers
//!
//! - **OpenAI**: OpenAI's chat completions API, or any compatible server (API key required)
//! - **Scripted**: Deterministic deltas for testing and development

pub mod openai;
mod sse;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use refundlens_abstraction::{
    ChatMessage, ModelError, ModelParameters, StreamingModel, TextDeltaStream,
};
use tracing::debug;

pub use openai::OpenAIChatModel;

/// One step of a scripted completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Yield a text delta.
    Delta(String),
    /// Fail mid-stream with the given error.
    Fail(ModelError),
}

/// A streaming model that replays a fixed script.
///
/// It records how many streams were opened and how many were released
/// (dropped), so callers can verify that partially consumed streams are freed.
#[derive(Debug)]
pub struct ScriptedModel {
    id: String,
    open_error: Option<ModelError>,
    steps: Vec<ScriptStep>,
    last_messages: std::sync::Mutex<Vec<ChatMessage>>,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl ScriptedModel {
    /// Creates a model whose stream yields the given steps in order.
    #[must_use]
    pub fn new(id: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        Self {
            id: id.into(),
            open_error: None,
            steps,
            last_messages: std::sync::Mutex::new(Vec::new()),
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a model that yields each delta and then ends normally.
    #[must_use]
    pub fn with_deltas(id: impl Into<String>, deltas: &[&str]) -> Self {
        Self::new(id, deltas.iter().map(|d| ScriptStep::Delta((*d).to_string())).collect())
    }

    /// Creates a model whose stream can never be opened.
    #[must_use]
    pub fn failing_to_open(id: impl Into<String>, error: ModelError) -> Self {
        let mut model = Self::new(id, Vec::new());
        model.open_error = Some(error);
        model
    }

    /// Number of streams successfully opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of opened streams that have since been dropped.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// The messages sent with the most recent open attempt.
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Bumps the release counter when the owning stream is dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StreamingModel for ScriptedModel {
    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<TextDeltaStream, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            parameters = ?parameters,
            "ScriptedModel opening stream"
        );

        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }

        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        let guard = ReleaseGuard(Arc::clone(&self.released));

        let items = self.steps.clone().into_iter().map(|step| match step {
            ScriptStep::Delta(text) => Ok(text),
            ScriptStep::Fail(err) => Err(err),
        });

        Ok(stream::iter(items)
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed())
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_replays_deltas() {
        let model = ScriptedModel::with_deltas("scripted", &["a", "b"]);
        let stream = model.stream_chat_completion(&[ChatMessage::user("q")], None).await.unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items, vec![Ok("a".to_string()), Ok("b".to_string())]);
        assert_eq!(model.opened(), 1);
        assert_eq!(model.released(), 1);
        assert_eq!(model.last_messages(), vec![ChatMessage::user("q")]);
    }

    #[tokio::test]
    async fn test_scripted_model_open_failure() {
        let model =
            ScriptedModel::failing_to_open("scripted", ModelError::RequestError("down".into()));
        let result = model.stream_chat_completion(&[], None).await;
        assert!(matches!(result, Err(ModelError::RequestError(_))));
        assert_eq!(model.opened(), 0);
    }

    #[tokio::test]
    async fn test_scripted_model_release_on_partial_consumption() {
        let model = ScriptedModel::with_deltas("scripted", &["a", "b", "c"]);
        let mut stream = model.stream_chat_completion(&[], None).await.unwrap();
        assert_eq!(stream.next().await, Some(Ok("a".to_string())));
        assert_eq!(model.released(), 0);
        drop(stream);
        assert_eq!(model.released(), 1);
    }
}

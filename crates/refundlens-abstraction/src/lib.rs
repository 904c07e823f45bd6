//! Model abstraction layer for refundlens.
//!
//! This crate defines the seam between the explanation pipeline and any remote
//! chat-completion service: the message and parameter types that go out, the
//! stream of text deltas that comes back, and the errors either side can raise.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error that can occur when interacting with an AI model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// An error occurred during the API request (e.g., network issues, invalid request).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The model returned an error (e.g., invalid input, server failure).
    #[error("Model Response Error: {0}")]
    ModelResponseError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The service rejected the configured credential.
    #[error("Authentication Error: {0}")]
    AuthenticationError(String),

    /// Provider quota exceeded or rate limit hit.
    #[error("Provider '{provider}' quota exceeded{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    QuotaExceeded {
        /// The provider name (e.g., "openai").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

/// The role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that constrain the assistant.
    System,
    /// The end user's question.
    User,
    /// A previous assistant reply.
    Assistant,
}

/// Represents a message in a conversation with a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// What sampling temperature to use, between 0 and 2.
    pub temperature: Option<f32>,

    /// The maximum number of tokens to generate in the chat completion.
    pub max_tokens: Option<u32>,
}

impl ModelParameters {
    /// Parameters with only an output-token budget set.
    #[must_use]
    pub fn with_max_tokens(max_tokens: u32) -> Self {
        Self { temperature: None, max_tokens: Some(max_tokens) }
    }
}

/// A live sequence of text deltas produced by a streaming completion.
///
/// The stream owns whatever transport resource backs it; dropping the stream
/// releases that resource, whether or not it was consumed to the end.
pub type TextDeltaStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send>>;

/// A chat model that can stream its completion back as text deltas.
///
/// All models must be `Send + Sync` so one instance can serve concurrent requests.
#[async_trait]
pub trait StreamingModel: Send + Sync {
    /// Opens a streaming chat completion.
    ///
    /// # Arguments
    /// * `messages` - The conversation, system instruction first
    /// * `parameters` - Optional parameters to control generation
    ///
    /// # Errors
    /// Returns a `ModelError` if the stream cannot be opened. Errors raised after the
    /// stream is open are delivered as items of the returned stream.
    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<TextDeltaStream, ModelError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_display_with_message() {
        let err = ModelError::QuotaExceeded {
            provider: "openai".to_string(),
            message: Some("insufficient_quota".to_string()),
        };
        assert_eq!(err.to_string(), "Provider 'openai' quota exceeded: insufficient_quota");
    }

    #[test]
    fn test_quota_exceeded_display_without_message() {
        let err = ModelError::QuotaExceeded { provider: "openai".to_string(), message: None };
        assert_eq!(err.to_string(), "Provider 'openai' quota exceeded");
    }

    #[test]
    fn test_chat_role_serializes_lowercase() {
        let msg = ChatMessage::system("be brief");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }

    #[test]
    fn test_parameters_with_max_tokens() {
        let params = ModelParameters::with_max_tokens(200);
        assert_eq!(params.max_tokens, Some(200));
        assert_eq!(params.temperature, None);
    }
}

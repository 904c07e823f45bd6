//! OpenAI-compatible streaming chat model.
//!
//! This module provides an implementation of the `StreamingModel` trait for any
//! server that implements the OpenAI Chat Completions API with `stream: true`.

use std::time::Duration;

use async_trait::async_trait;
use refundlens_abstraction::{
    ChatMessage, ModelError, ModelParameters, StreamingModel, TextDeltaStream,
};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use crate::sse::SseDeltaStream;

/// Default base URL of the hosted OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible streaming chat model.
#[derive(Debug, Clone)]
pub struct OpenAIChatModel {
    /// The model ID (e.g., "gpt-4o-mini").
    model_id: String,
    /// Base URL for the API endpoint (e.g., "https://api.openai.com/v1").
    base_url: String,
    /// The API key for authentication.
    api_key: String,
    /// HTTP client for requests.
    client: Client,
}

impl OpenAIChatModel {
    /// Creates a new `OpenAIChatModel`.
    ///
    /// # Arguments
    /// * `model_id` - The model to request (e.g., "gpt-4o-mini")
    /// * `base_url` - The base URL for the API endpoint
    /// * `api_key` - The API key for authentication
    /// * `timeout` - Upper bound for one request, streaming body included
    ///
    /// # Errors
    /// Returns a `ModelError` if the HTTP client cannot be built.
    pub fn new(
        model_id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ModelError::RequestError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            model_id: model_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Maps a non-success HTTP status to the matching `ModelError`.
    fn status_error(status: reqwest::StatusCode, error_text: String) -> ModelError {
        match status.as_u16() {
            401 | 403 => ModelError::AuthenticationError(format!(
                "Authentication failed ({}): {}",
                status, error_text
            )),
            402 | 429 => ModelError::QuotaExceeded {
                provider: "openai".to_string(),
                message: Some(error_text),
            },
            500..=599 => {
                ModelError::ModelResponseError(format!("Server error ({}): {}", status, error_text))
            }
            _ => ModelError::ModelResponseError(format!("API error ({}): {}", status, error_text)),
        }
    }
}

#[async_trait]
impl StreamingModel for OpenAIChatModel {
    async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<TextDeltaStream, ModelError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            parameters = ?parameters,
            "OpenAIChatModel opening streaming chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let parameters = parameters.unwrap_or_default();
        let request_body = StreamingRequest {
            model: &self.model_id,
            messages,
            stream: true,
            temperature: parameters.temperature,
            max_tokens: parameters.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Failed to send streaming request to OpenAI API");
                ModelError::RequestError(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                url = %url,
                "OpenAI API returned error status for streaming request"
            );
            return Err(Self::status_error(status, error_text));
        }

        Ok(Box::pin(SseDeltaStream::new(Box::pin(response.bytes_stream()))))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Serialize)]
struct StreamingRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

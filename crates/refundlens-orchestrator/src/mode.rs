//! Demo/AI dispatch, decided once at startup.

use std::sync::Arc;

use refundlens_abstraction::{ModelError, StreamingModel};
use refundlens_core::Config;
use refundlens_models::OpenAIChatModel;
use tracing::info;

use crate::generators::{AiGenerator, DemoGenerator, ExplanationGenerator, GenerationMode};

/// Holds the generator every request uses.
#[derive(Clone)]
pub struct ModeSelector {
    generator: Arc<dyn ExplanationGenerator>,
}

impl std::fmt::Debug for ModeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSelector").field("mode", &self.mode()).finish()
    }
}

impl ModeSelector {
    /// AI mode when a credential is configured, demo mode otherwise.
    ///
    /// # Errors
    /// Returns a `ModelError` if the chat-completion client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ModelError> {
        match config.ai.credential() {
            Some(api_key) => {
                let model = OpenAIChatModel::new(
                    config.ai.model.clone(),
                    config.ai.base_url.clone(),
                    api_key,
                    config.ai.request_timeout(),
                )?;
                info!(model_id = %config.ai.model, base_url = %model.base_url(), "AI mode enabled");
                Ok(Self::ai(Arc::new(model), config.ai.max_tokens))
            }
            None => {
                info!("No AI credential configured, explanations use demo mode");
                Ok(Self::demo(DemoGenerator::new(config.pacing.demo_chunk_delay())))
            }
        }
    }

    pub fn demo(generator: DemoGenerator) -> Self {
        Self { generator: Arc::new(generator) }
    }

    pub fn ai(model: Arc<dyn StreamingModel>, max_tokens: u32) -> Self {
        Self { generator: Arc::new(AiGenerator::new(model, max_tokens)) }
    }

    /// Uses an arbitrary generator.
    pub fn fixed(generator: Arc<dyn ExplanationGenerator>) -> Self {
        Self { generator }
    }

    pub fn mode(&self) -> GenerationMode {
        self.generator.mode()
    }

    /// The generator for the current request.
    pub fn select(&self) -> Arc<dyn ExplanationGenerator> {
        Arc::clone(&self.generator)
    }
}

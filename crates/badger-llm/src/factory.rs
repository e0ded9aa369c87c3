//! Factory for creating inference providers.

use std::sync::Arc;

use tracing::debug;

use badger_core::config::InferenceProvider;
use badger_core::error::BadgerResult;
use badger_core::traits::{InferenceConfig, TextInference};

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAIProvider;

/// Factory for creating inference providers.
pub struct InferenceFactory;

impl InferenceFactory {
    /// Create an inference provider from the given configuration.
    pub fn create(
        provider: InferenceProvider,
        config: InferenceConfig,
    ) -> BadgerResult<Arc<dyn TextInference>> {
        debug!(?provider, model = %config.model, "creating inference provider");
        match provider {
            InferenceProvider::OpenAI => {
                let inference = OpenAIProvider::new(config)?;
                Ok(Arc::new(inference))
            }
            InferenceProvider::Anthropic => {
                let inference = AnthropicProvider::new(config)?;
                Ok(Arc::new(inference))
            }
        }
    }

    /// Create an OpenAI provider with default configuration.
    pub fn openai() -> BadgerResult<Arc<dyn TextInference>> {
        Self::create(InferenceProvider::OpenAI, InferenceConfig::default())
    }

    /// Create an OpenAI provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> BadgerResult<Arc<dyn TextInference>> {
        let config = InferenceConfig::default().with_model(model);
        Self::create(InferenceProvider::OpenAI, config)
    }

    /// Create an Anthropic provider with default configuration.
    pub fn anthropic() -> BadgerResult<Arc<dyn TextInference>> {
        Self::create(InferenceProvider::Anthropic, InferenceConfig::default())
    }

    /// Create an Anthropic provider with a specific model.
    pub fn anthropic_with_model(model: impl Into<String>) -> BadgerResult<Arc<dyn TextInference>> {
        let config = InferenceConfig::default().with_model(model);
        Self::create(InferenceProvider::Anthropic, config)
    }
}

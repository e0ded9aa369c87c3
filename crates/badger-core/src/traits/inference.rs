//! Text inference provider abstraction.
//!
//! Classification, extraction, and question answering all go through this
//! trait, so providers can be swapped (or mocked in tests) without touching
//! the processing stages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BadgerResult;
use crate::types::Message;

/// Response from a text inference call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Generated text, if the model produced any.
    pub content: Option<String>,
    /// Token usage statistics, if the provider reports them.
    pub usage: Option<TokenUsage>,
}

impl InferenceResponse {
    /// Generated text, or an empty string when the model produced none.
    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Requested output shape for a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text.
    Text,
    /// A single JSON object.
    Json,
}

/// Per-call generation options. Unset fields fall back to provider defaults.
#[derive(Debug, Clone, Default)]
pub struct InferenceOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub response_format: Option<ResponseFormat>,
}

impl InferenceOptions {
    /// Options requesting a JSON object response.
    pub fn json() -> Self {
        Self {
            response_format: Some(ResponseFormat::Json),
            ..Default::default()
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for text inference providers.
#[async_trait]
pub trait TextInference: Send + Sync {
    /// Generate a completion for the given prompt messages.
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<InferenceOptions>,
    ) -> BadgerResult<InferenceResponse>;

    /// Name of the underlying model.
    fn model_name(&self) -> &str;

    /// Whether the provider honors [`ResponseFormat::Json`] natively.
    fn supports_json_mode(&self) -> bool {
        true
    }
}

/// Configuration shared by inference providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key. Usually supplied via environment instead of config files.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the provider API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Default completion token budget.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl InferenceConfig {
    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.1);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: InferenceConfig = serde_json::from_str(r#"{"model": "gpt-4o"}"#).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn test_content_or_empty() {
        let response = InferenceResponse {
            content: None,
            usage: None,
        };
        assert_eq!(response.content_or_empty(), "");
    }

    #[test]
    fn test_json_options() {
        let options = InferenceOptions::json().with_temperature(0.0);
        assert_eq!(options.response_format, Some(ResponseFormat::Json));
        assert_eq!(options.temperature, Some(0.0));
    }
}

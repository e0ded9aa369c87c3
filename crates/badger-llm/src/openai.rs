//! OpenAI inference provider implementation.

use async_trait::async_trait;

use badger_core::error::{BadgerError, BadgerResult};
use badger_core::traits::{
    InferenceConfig, InferenceOptions, InferenceResponse, TextInference, TokenUsage,
};
use badger_core::types::Message;

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest,
    },
    Client,
};

/// OpenAI inference provider.
pub struct OpenAIProvider {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: InferenceConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI inference provider.
    pub fn new(config: InferenceConfig) -> BadgerResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                BadgerError::Configuration("OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        #[cfg(feature = "openai")]
        let openai_config = if let Some(ref base_url) = config.base_url {
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        #[cfg(not(feature = "openai"))]
        let _ = api_key;

        #[cfg(feature = "openai")]
        let client = Client::with_config(openai_config);

        let mut config = config;
        if config.model.is_empty() {
            config.model = "gpt-4o-mini".to_string();
        }

        Ok(Self {
            #[cfg(feature = "openai")]
            client,
            config,
        })
    }

    /// Check if this is a reasoning model that rejects sampling params.
    fn is_reasoning_model(&self) -> bool {
        let model_lower = self.config.model.to_lowercase();
        ["o1", "o3", "gpt-5"]
            .iter()
            .any(|m| model_lower.contains(m))
    }

    #[cfg(feature = "openai")]
    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            badger_core::types::MessageRole::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: msg.name.clone(),
                })
            }
            badger_core::types::MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: msg.name.clone(),
                })
            }
            badger_core::types::MessageRole::Assistant => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(
                        async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        ),
                    ),
                    name: msg.name.clone(),
                    ..Default::default()
                })
            }
        }
    }
}

#[async_trait]
impl TextInference for OpenAIProvider {
    #[cfg(feature = "openai")]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<InferenceOptions>,
    ) -> BadgerResult<InferenceResponse> {
        let chat_messages: Vec<ChatCompletionRequestMessage> =
            messages.iter().map(Self::message_to_openai).collect();

        let options = options.unwrap_or_default();

        let mut request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: chat_messages,
            ..Default::default()
        };

        // Only add temperature/top_p for non-reasoning models
        if !self.is_reasoning_model() {
            request.temperature = Some(options.temperature.unwrap_or(self.config.temperature));
            request.top_p = options.top_p;
            request.max_tokens = Some(options.max_tokens.unwrap_or(self.config.max_tokens));
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| BadgerError::inference(format!("OpenAI API error: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| BadgerError::inference_response("No response choices returned"))?;

        let content = choice.message.content.clone();

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(InferenceResponse { content, usage })
    }

    #[cfg(not(feature = "openai"))]
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<InferenceOptions>,
    ) -> BadgerResult<InferenceResponse> {
        Err(BadgerError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_json_mode(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_model_falls_back_to_default() {
        let config = InferenceConfig::default()
            .with_model("")
            .with_api_key("sk-test");
        let provider = OpenAIProvider::new(config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_reasoning_model_detection() {
        let config = InferenceConfig::default()
            .with_model("o1-mini")
            .with_api_key("sk-test");
        let provider = OpenAIProvider::new(config).unwrap();
        assert!(provider.is_reasoning_model());

        let config = InferenceConfig::default()
            .with_model("gpt-4o")
            .with_api_key("sk-test");
        let provider = OpenAIProvider::new(config).unwrap();
        assert!(!provider.is_reasoning_model());
    }
}

//! badger-llm - Inference provider implementations for badger.
//!
//! This crate provides the text inference backends the assistant uses for
//! intent classification, task extraction, and question answering.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - GPT-4o, GPT-4.1, etc.
//! - **Anthropic** (feature: `anthropic`) - Claude 3.5, Claude 3, etc.
//!
//! # Example
//!
//! ```ignore
//! use badger_llm::InferenceFactory;
//!
//! // Create an OpenAI provider
//! let inference = InferenceFactory::openai()?;
//!
//! // Or with a specific model
//! let inference = InferenceFactory::openai_with_model("gpt-4o")?;
//!
//! // Create an Anthropic provider
//! let inference = InferenceFactory::anthropic_with_model("claude-3-5-haiku-latest")?;
//! ```

mod anthropic;
mod factory;
mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::InferenceFactory;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use badger_core::config::InferenceProvider;
pub use badger_core::traits::{
    InferenceConfig, InferenceOptions, InferenceResponse, ResponseFormat, TextInference, TokenUsage,
};

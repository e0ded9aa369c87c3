//! Trait seams for pluggable collaborators.

pub mod inference;
pub mod notifier;

pub use inference::{
    InferenceConfig, InferenceOptions, InferenceResponse, ResponseFormat, TextInference,
    TokenUsage,
};
pub use notifier::{Notifier, NotifierConfig};

//! badger-core - Core library for the badger chat assistant.
//!
//! Turns natural-language chat messages into trackable work items, records
//! who was asked what, and nudges about approaching deadlines and
//! unanswered mentions through throttled, scheduled sweeps.
//!
//! # Example
//!
//! ```ignore
//! use badger_core::{AssistantConfig, AssistantRuntime};
//!
//! let config = AssistantConfig::from_env();
//! let mut runtime = AssistantRuntime::new(config, inference, notifier).await?;
//! runtime.start().await?;
//!
//! // Feed normalized inbound messages from the platform adapter
//! let action = runtime.handle_message(&message, None).await?;
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod mentions;
pub mod model_output;
pub mod pipeline;
pub mod reminders;
pub mod runtime;
pub mod store;
pub mod text;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::AssistantConfig;
pub use error::{BadgerError, BadgerResult};
pub use pipeline::{MessagePipeline, PipelineAction};
pub use runtime::AssistantRuntime;
pub use traits::{InferenceConfig, Notifier, NotifierConfig, TextInference};
pub use types::{
    InboundMessage, Mention, MentionState, Message, MessageRole, Outcome, Priority, WorkItem,
    WorkItemFilter, WorkItemStatus, WorkItemUpdate,
};

//! Outbound notification abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BadgerResult;

/// Trait for posting messages back to the chat platform.
///
/// Implementations live in platform adapter crates; the core only needs to
/// address a conversation and optionally thread the notice onto an existing
/// message.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `conversation_id`. When `thread_anchor_id` is set the
    /// message is posted as a reply in that thread.
    async fn post(
        &self,
        conversation_id: &str,
        text: &str,
        thread_anchor_id: Option<&str>,
    ) -> BadgerResult<()>;
}

/// Configuration shared by notifier providers. Which fields apply depends
/// on the provider; unused ones are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Chat platform API token.
    #[serde(default)]
    pub token: Option<String>,
    /// Endpoint for webhook delivery.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Secret used to sign webhook payloads.
    #[serde(default)]
    pub signing_secret: Option<String>,
    /// Override for the platform API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl NotifierConfig {
    /// Set the API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the webhook endpoint.
    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Set the webhook signing secret.
    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

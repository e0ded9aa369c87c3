//! Factory for creating notifiers.

use std::sync::Arc;

use tracing::debug;

use badger_core::config::NotifierProvider;
use badger_core::error::BadgerResult;
use badger_core::traits::{Notifier, NotifierConfig};

use crate::slack::SlackNotifier;
use crate::webhook::WebhookNotifier;

/// Factory for creating notifiers.
pub struct NotifierFactory;

impl NotifierFactory {
    /// Create a notifier from the given configuration.
    pub fn create(
        provider: NotifierProvider,
        config: NotifierConfig,
    ) -> BadgerResult<Arc<dyn Notifier>> {
        debug!(?provider, "creating notifier");
        match provider {
            NotifierProvider::Slack => {
                let notifier = SlackNotifier::new(config)?;
                Ok(Arc::new(notifier))
            }
            NotifierProvider::Webhook => {
                let notifier = WebhookNotifier::new(config)?;
                Ok(Arc::new(notifier))
            }
        }
    }

    /// Create a Slack notifier with the given bot token.
    pub fn slack(token: impl Into<String>) -> BadgerResult<Arc<dyn Notifier>> {
        let config = NotifierConfig::default().with_token(token);
        Self::create(NotifierProvider::Slack, config)
    }

    /// Create a webhook notifier delivering to the given URL.
    pub fn webhook(url: impl Into<String>) -> BadgerResult<Arc<dyn Notifier>> {
        let config = NotifierConfig::default().with_webhook_url(url);
        Self::create(NotifierProvider::Webhook, config)
    }
}

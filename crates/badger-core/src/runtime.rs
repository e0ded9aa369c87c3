//! Assembled assistant runtime.
//!
//! Wires the stores, trackers, pipeline, and reminder scheduler together
//! from an [`AssistantConfig`] and a pair of injected providers, and manages
//! the scheduler lifecycle with unified startup and graceful shutdown.

use std::sync::Arc;

use tracing::{debug, info};

use crate::classify::TaskJudge;
use crate::config::AssistantConfig;
use crate::error::{BadgerError, BadgerResult};
use crate::mentions::{MentionAnalyzer, MentionTracker};
use crate::pipeline::{MessagePipeline, PipelineAction};
use crate::reminders::{NotificationThrottle, ReminderEngine, ReminderScheduler, SweepReport};
use crate::store::{MentionStore, SqliteMentionStore, SqliteWorkItemStore, WorkItemStore};
use crate::traits::{Notifier, TextInference};
use crate::types::{InboundMessage, Message};

/// Fully wired assistant.
///
/// The inference client and the notifier come from provider crates (or from
/// test doubles); everything else is built here from the configuration.
///
/// # Example
///
/// ```ignore
/// use badger_core::{AssistantConfig, AssistantRuntime};
///
/// # async fn example(
/// #     inference: std::sync::Arc<dyn badger_core::traits::TextInference>,
/// #     notifier: std::sync::Arc<dyn badger_core::traits::Notifier>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let config = AssistantConfig::from_env();
/// let mut runtime = AssistantRuntime::new(config, inference, notifier).await?;
/// runtime.start().await?;
/// // ... feed inbound messages to runtime.handle_message(...) ...
/// runtime.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct AssistantRuntime {
    pipeline: MessagePipeline,
    scheduler: ReminderScheduler,
    engine: Arc<ReminderEngine>,
    tracker: MentionTracker,
    work_items: Arc<dyn WorkItemStore>,
    mentions: Arc<dyn MentionStore>,
    config: AssistantConfig,
}

impl AssistantRuntime {
    /// Create a runtime from configuration and injected providers.
    ///
    /// This builds the stores and schedulers but does not start the
    /// periodic sweeps; call `start()` for that.
    pub async fn new(
        config: AssistantConfig,
        inference: Arc<dyn TextInference>,
        notifier: Arc<dyn Notifier>,
    ) -> BadgerResult<Self> {
        debug!(
            bot_user_id = %config.bot_user_id,
            line_classification = config.enable_line_classification,
            cooldown_minutes = config.cooldown_minutes,
            "creating assistant runtime"
        );

        let (work_items, mentions): (Arc<dyn WorkItemStore>, Arc<dyn MentionStore>) =
            match &config.db_path {
                Some(path) => {
                    debug!(path = %path.display(), "opening file-backed stores");
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    (
                        Arc::new(SqliteWorkItemStore::new(path)?),
                        Arc::new(SqliteMentionStore::new(path)?),
                    )
                }
                None => {
                    debug!("opening in-memory stores");
                    (
                        Arc::new(SqliteWorkItemStore::in_memory()?),
                        Arc::new(SqliteMentionStore::in_memory()?),
                    )
                }
            };

        let tracker = MentionTracker::new(mentions.clone(), work_items.clone());
        let analyzer = if config.enable_line_classification {
            MentionAnalyzer::with_judge(tracker.clone(), TaskJudge::new(inference.clone()))
        } else {
            MentionAnalyzer::new(tracker.clone())
        };

        let throttle = Arc::new(NotificationThrottle::with_cooldown_minutes(
            config.cooldown_minutes,
        ));
        let engine = Arc::new(ReminderEngine::new(
            work_items.clone(),
            tracker.clone(),
            notifier.clone(),
            throttle,
        ));
        let scheduler = ReminderScheduler::new(engine.clone(), config.schedule.clone())
            .await
            .map_err(|e| {
                BadgerError::internal(format!("Failed to create reminder scheduler: {}", e))
            })?;

        let pipeline = MessagePipeline::new(
            &config.bot_user_id,
            inference,
            notifier,
            tracker.clone(),
            analyzer,
            work_items.clone(),
        )
        .with_confidence_threshold(config.confidence_threshold)
        .with_timezone(&config.timezone);

        Ok(Self {
            pipeline,
            scheduler,
            engine,
            tracker,
            work_items,
            mentions,
            config,
        })
    }

    /// Start the periodic sweep scheduler.
    pub async fn start(&self) -> BadgerResult<()> {
        self.scheduler.start().await.map_err(|e| {
            BadgerError::internal(format!("Failed to start reminder scheduler: {}", e))
        })?;
        info!("assistant runtime started");
        Ok(())
    }

    /// Shut down the scheduler gracefully.
    pub async fn shutdown(&mut self) -> BadgerResult<()> {
        self.scheduler.shutdown().await.map_err(|e| {
            BadgerError::internal(format!("Failed to shutdown reminder scheduler: {}", e))
        })?;
        info!("assistant runtime stopped");
        Ok(())
    }

    /// Process one inbound message through the pipeline.
    pub async fn handle_message(
        &self,
        message: &InboundMessage,
        thread_context: Option<&[Message]>,
    ) -> BadgerResult<PipelineAction> {
        self.pipeline.handle_message(message, thread_context).await
    }

    /// Run the wide upcoming sweep and the overdue sweep immediately.
    pub async fn run_sweeps_now(&self) -> BadgerResult<(SweepReport, SweepReport)> {
        self.scheduler.run_now().await
    }

    /// Get the message pipeline.
    pub fn pipeline(&self) -> &MessagePipeline {
        &self.pipeline
    }

    /// Get the reminder engine.
    pub fn engine(&self) -> &Arc<ReminderEngine> {
        &self.engine
    }

    /// Get the mention tracker.
    pub fn tracker(&self) -> &MentionTracker {
        &self.tracker
    }

    /// Get the work item store.
    pub fn work_items(&self) -> Arc<dyn WorkItemStore> {
        self.work_items.clone()
    }

    /// Get the mention store.
    pub fn mentions(&self) -> Arc<dyn MentionStore> {
        self.mentions.clone()
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{InferenceOptions, InferenceResponse};
    use crate::types::WorkItemFilter;
    use async_trait::async_trait;

    struct MockInference;

    #[async_trait]
    impl TextInference for MockInference {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: Option<InferenceOptions>,
        ) -> BadgerResult<InferenceResponse> {
            Ok(InferenceResponse {
                content: Some(r#"{"is_task": true, "confidence": 90}"#.to_string()),
                usage: None,
            })
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn post(
            &self,
            _conversation_id: &str,
            _text: &str,
            _thread_anchor_id: Option<&str>,
        ) -> BadgerResult<()> {
            Ok(())
        }
    }

    fn test_config() -> AssistantConfig {
        AssistantConfig::builder()
            .bot_user_id("UBOT")
            .in_memory()
            .build()
    }

    async fn runtime() -> AssistantRuntime {
        AssistantRuntime::new(test_config(), Arc::new(MockInference), Arc::new(NullNotifier))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_runtime_creation_in_memory() {
        let runtime = runtime().await;
        assert!(runtime
            .work_items()
            .list(&WorkItemFilter::default())
            .unwrap()
            .is_empty());
        assert_eq!(runtime.config().bot_user_id, "UBOT");
    }

    #[tokio::test]
    async fn test_runtime_start_and_shutdown() {
        let mut runtime = runtime().await;
        runtime.start().await.unwrap();
        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_runtime_routes_messages() {
        let runtime = runtime().await;
        let message = InboundMessage::new("C01", "1.0", "U_ALICE", "<@UBOT> help")
            .with_addressed_users(vec!["UBOT".to_string()]);

        let action = runtime.handle_message(&message, None).await.unwrap();
        assert!(matches!(action, PipelineAction::HelpShown));
    }

    #[tokio::test]
    async fn test_runtime_records_mentions_with_judgment() {
        let runtime = runtime().await;
        let message = InboundMessage::new(
            "C01",
            "2.0",
            "U_ALICE",
            "<@U_BOB> please update the runbook",
        )
        .with_addressed_users(vec!["U_BOB".to_string()]);

        runtime.handle_message(&message, None).await.unwrap();
        assert_eq!(runtime.tracker().unresolved_mentions(0).unwrap().len(), 1);
    }
}

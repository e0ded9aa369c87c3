//! Integration tests for the end-to-end assistant flow.
//!
//! Exercises the public runtime API: message intake through the pipeline,
//! mention tracking, escalation sweeps, and deadline sweeps, against
//! in-memory stores with scripted inference and a recording notifier.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use badger_core::traits::{InferenceOptions, InferenceResponse, Notifier, TextInference};
use badger_core::types::{
    InboundMessage, Message, Priority, WorkItem, WorkItemFilter, WorkItemStatus,
};
use badger_core::{AssistantConfig, AssistantRuntime, BadgerError, BadgerResult, PipelineAction};

/// Inference mock returning one canned reply for every call, or failing
/// when none is set.
struct MockInference {
    reply: Option<String>,
}

impl MockInference {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { reply: None })
    }
}

#[async_trait]
impl TextInference for MockInference {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<InferenceOptions>,
    ) -> BadgerResult<InferenceResponse> {
        match &self.reply {
            Some(content) => Ok(InferenceResponse {
                content: Some(content.clone()),
                usage: None,
            }),
            None => Err(BadgerError::inference("mock failure")),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
struct RecordingNotifier {
    posts: Mutex<Vec<(String, String, Option<String>)>>,
}

impl RecordingNotifier {
    fn posts(&self) -> Vec<(String, String, Option<String>)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(
        &self,
        conversation_id: &str,
        text: &str,
        thread_anchor_id: Option<&str>,
    ) -> BadgerResult<()> {
        self.posts.lock().unwrap().push((
            conversation_id.to_string(),
            text.to_string(),
            thread_anchor_id.map(|a| a.to_string()),
        ));
        Ok(())
    }
}

async fn runtime_with(
    inference: Arc<dyn TextInference>,
) -> (AssistantRuntime, Arc<RecordingNotifier>) {
    let config = AssistantConfig::builder()
        .bot_user_id("UBOT")
        .in_memory()
        .build();
    let notifier = Arc::new(RecordingNotifier::default());
    let runtime = AssistantRuntime::new(config, inference, notifier.clone())
        .await
        .unwrap();
    (runtime, notifier)
}

fn open_items(runtime: &AssistantRuntime) -> Vec<WorkItem> {
    runtime
        .work_items()
        .list(&WorkItemFilter::default().with_status(WorkItemStatus::Open))
        .unwrap()
}

/// A direct request to the bot becomes a tracked work item, the author gets
/// a threaded confirmation, and a duplicate transport delivery of the same
/// message does not create a second item.
#[tokio::test]
async fn test_task_request_end_to_end() {
    let extraction =
        r#"{"title": "prepare the onboarding doc", "due_at": null, "priority": null}"#;
    let (runtime, notifier) = runtime_with(MockInference::replying(extraction)).await;

    let message = InboundMessage::new(
        "C01",
        "1700000000.000100",
        "U_ALICE",
        "<@UBOT> please prepare the onboarding doc",
    )
    .with_addressed_users(vec!["UBOT".to_string()]);

    let action = runtime.handle_message(&message, None).await.unwrap();
    let PipelineAction::CreatedWorkItem(item) = action else {
        panic!("expected a created work item, got {:?}", action);
    };
    assert_eq!(item.text, "prepare the onboarding doc");
    assert_eq!(item.assignee.as_deref(), Some("U_ALICE"));
    assert_eq!(item.origin_message_id, "1700000000.000100");

    let posts = notifier.posts();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].1.starts_with("Got it."));
    assert_eq!(posts[0].2.as_deref(), Some("1700000000.000100"));

    // Redelivery of the same event reuses the open item
    let action = runtime.handle_message(&message, None).await.unwrap();
    let PipelineAction::CreatedWorkItem(again) = action else {
        panic!("expected the existing work item");
    };
    assert_eq!(again.id, item.id);
    assert_eq!(open_items(&runtime).len(), 1);
    assert_eq!(notifier.posts().len(), 1, "no second confirmation");
}

/// A teammate mention that goes unanswered is escalated by the sweep into a
/// work item assigned to the addressed user, exactly once.
#[tokio::test]
async fn test_mention_escalation_end_to_end() {
    let judgment = r#"{"is_task": true, "confidence": 90}"#;
    let (runtime, notifier) = runtime_with(MockInference::replying(judgment)).await;

    let message = InboundMessage::new(
        "C01",
        "1700000000.000200",
        "U_ALICE",
        "<@U_BOB> can you own the deploy runbook? 🔴",
    )
    .with_addressed_users(vec!["U_BOB".to_string()]);

    let action = runtime.handle_message(&message, None).await.unwrap();
    let PipelineAction::MentionsRecorded(analysis) = action else {
        panic!("expected recorded mentions, got {:?}", action);
    };
    assert_eq!(analysis.recorded, 1);
    assert!(notifier.posts().is_empty(), "recording must stay silent");

    let report = runtime.engine().sweep_escalations(0).await.unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.notified, 1);

    let items = open_items(&runtime);
    assert_eq!(items.len(), 1);
    assert!(items[0].text.starts_with("[unanswered] "));
    assert_eq!(items[0].assignee.as_deref(), Some("U_BOB"));
    assert_eq!(items[0].priority, Priority::High);

    let posts = notifier.posts();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].1.contains("<@U_BOB>"));
    assert_eq!(posts[0].2.as_deref(), Some("1700000000.000200"));

    // A second sweep finds nothing left to escalate
    let report = runtime.engine().sweep_escalations(0).await.unwrap();
    assert_eq!(report.matched, 0);
    assert_eq!(open_items(&runtime).len(), 1);
}

/// A reply in the thread resolves the mention before the sweep sees it.
#[tokio::test]
async fn test_thread_reply_prevents_escalation() {
    let judgment = r#"{"is_task": true, "confidence": 90}"#;
    let (runtime, notifier) = runtime_with(MockInference::replying(judgment)).await;

    let ask = InboundMessage::new(
        "C01",
        "1700000000.000300",
        "U_ALICE",
        "<@U_BOB> can you check the alerts backlog?",
    )
    .with_addressed_users(vec!["U_BOB".to_string()]);
    runtime.handle_message(&ask, None).await.unwrap();

    let reply = InboundMessage::new("C01", "1700000000.000301", "U_BOB", "on it, done by lunch")
        .with_thread_anchor("1700000000.000300");
    let action = runtime.handle_message(&reply, None).await.unwrap();
    let PipelineAction::RepliesRecorded(count) = action else {
        panic!("expected resolved replies, got {:?}", action);
    };
    assert_eq!(count, 1);

    let report = runtime.engine().sweep_escalations(0).await.unwrap();
    assert_eq!(report.matched, 0);
    assert!(open_items(&runtime).is_empty());
    assert!(notifier.posts().is_empty());
}

/// Deadline sweeps notify once per item per cooldown window, across both
/// the upcoming and overdue sweeps.
#[tokio::test]
async fn test_deadline_sweeps_share_throttle() {
    let (runtime, notifier) = runtime_with(MockInference::failing()).await;

    let soon = WorkItem::new("finish the audit", "C02", "1700000000.000400", "U_ALICE")
        .with_due_at(Utc::now() + Duration::hours(2));
    let late = WorkItem::new("send the invoice", "C02", "1700000000.000500", "U_ALICE")
        .with_due_at(Utc::now() - Duration::hours(3));
    runtime.work_items().create(&soon).unwrap();
    runtime.work_items().create(&late).unwrap();

    let (upcoming, overdue) = runtime.run_sweeps_now().await.unwrap();
    assert_eq!(upcoming.notified, 1);
    assert_eq!(overdue.notified, 1);
    assert_eq!(notifier.posts().len(), 2);

    // Within the cooldown both items are matched again but stay quiet
    let (upcoming, overdue) = runtime.run_sweeps_now().await.unwrap();
    assert_eq!(upcoming.matched, 1);
    assert_eq!(upcoming.skipped, 1);
    assert_eq!(overdue.matched, 1);
    assert_eq!(overdue.skipped, 1);
    assert_eq!(notifier.posts().len(), 2);
}

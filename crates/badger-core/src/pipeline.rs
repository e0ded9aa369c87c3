//! Inbound message pipeline.
//!
//! Routes each normalized chat message through reply resolution, intent
//! classification, and the intent-specific handlers, and posts the
//! assistant's responses back into the originating thread. The pipeline is
//! the only place routing decisions live; the stages it calls are all
//! independently testable.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::classify::{Intent, IntentClassifier};
use crate::error::BadgerResult;
use crate::extract::{suggest_assignee, PriorityResolver, ReminderRequest, TaskExtractor};
use crate::mentions::{MentionAnalysis, MentionAnalyzer, MentionTracker};
use crate::store::WorkItemStore;
use crate::text;
use crate::traits::{InferenceOptions, Notifier, TextInference};
use crate::types::{
    format_messages, InboundMessage, Message, Outcome, Priority, WorkItem, WorkItemFilter,
    WorkItemStatus,
};

/// Fixed usage text for the help intent.
const HELP_TEXT: &str = "Here's what I can do:\n\
• Mention me with a request (\"ask <@someone> to send the report by Friday\") and I'll track it as a work item with deadline and priority.\n\
• Mention teammates directly and I'll watch for their reply, nudging when one is overdue.\n\
• Mark priority with 🔴 / 🟡 / 🟢 anywhere in the line.\n\
• Say \"remind me ...\" for a one-off reminder, or \"cancel the reminder\" to drop one.\n\
• Ask me what happened in a thread and I'll answer from the discussion.";

const CONFIRM_PROMPT: &str =
    "That sounds like something I should track, but I'm not certain. Rephrase it as a direct request (\"please ...\") and I'll file it.";

const ANSWER_SYSTEM: &str = "You are a helpful team assistant in a chat workspace. \
Answer the question briefly and concretely, using the conversation context when provided. \
If you do not know, say so plainly.";

const ANSWER_APOLOGY: &str =
    "Sorry, I couldn't look that up just now. Please try again in a bit.";

const SAVE_FAILURE_NOTICE: &str =
    "Sorry, I couldn't save that task just now. Please try again in a moment.";

/// What the pipeline did with a message.
#[derive(Debug, Clone)]
pub enum PipelineAction {
    /// A work item was created (or found already tracked for this anchor).
    CreatedWorkItem(WorkItem),
    /// The task intent was below the confidence threshold; the author was
    /// asked to rephrase.
    ConfirmationRequested { intent: Intent, confidence: u8 },
    /// A reminder was requested; registration is the embedder's concern.
    ReminderRequested(ReminderRequest),
    /// A reminder cancellation was requested.
    ReminderCancelRequested,
    /// An information question was answered in the thread.
    Answered,
    /// The usage text was posted.
    HelpShown,
    /// Mentions of other users were recorded.
    MentionsRecorded(MentionAnalysis),
    /// The message was a thread reply that resolved pending mentions.
    RepliesRecorded(usize),
    /// Nothing to do.
    Ignored,
}

/// Routes inbound messages end to end.
pub struct MessagePipeline {
    classifier: IntentClassifier,
    extractor: TaskExtractor,
    priorities: PriorityResolver,
    tracker: MentionTracker,
    analyzer: MentionAnalyzer,
    work_items: Arc<dyn WorkItemStore>,
    notifier: Arc<dyn Notifier>,
    inference: Arc<dyn TextInference>,
    bot_user_id: String,
}

impl MessagePipeline {
    pub fn new(
        bot_user_id: impl Into<String>,
        inference: Arc<dyn TextInference>,
        notifier: Arc<dyn Notifier>,
        tracker: MentionTracker,
        analyzer: MentionAnalyzer,
        work_items: Arc<dyn WorkItemStore>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(inference.clone()),
            extractor: TaskExtractor::new(inference.clone()),
            priorities: PriorityResolver::new(inference.clone()),
            tracker,
            analyzer,
            work_items,
            notifier,
            inference,
            bot_user_id: bot_user_id.into(),
        }
    }

    /// Override the confidence threshold for acting on task intents.
    pub fn with_confidence_threshold(mut self, threshold: u8) -> Self {
        self.classifier = self.classifier.with_confidence_threshold(threshold);
        self
    }

    /// Set the timezone named in extraction prompts.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.extractor = self.extractor.with_timezone(timezone);
        self
    }

    /// Process one inbound message.
    ///
    /// `thread_context` carries the earlier messages of the thread, oldest
    /// first, when the transport has them. It feeds the model fallback of
    /// classification, question answering, and the work-item summary.
    pub async fn handle_message(
        &self,
        message: &InboundMessage,
        thread_context: Option<&[Message]>,
    ) -> BadgerResult<PipelineAction> {
        if message.author_id == self.bot_user_id {
            return Ok(PipelineAction::Ignored);
        }

        // A thread reply resolves the author's pending mentions first,
        // whatever else the message turns out to be.
        let mut replies = 0;
        if message.is_thread_reply() {
            if let Some(anchor) = &message.thread_anchor_id {
                match self
                    .tracker
                    .mark_replied(&message.conversation_id, anchor, &message.author_id)
                {
                    Ok(resolved) => replies = resolved.len(),
                    Err(e) => warn!(error = %e, "failed to resolve replies"),
                }
            }
        }

        let addressed = self.addressed_users(message);
        if addressed.iter().any(|id| *id == self.bot_user_id) {
            return self
                .handle_assistant_request(message, &addressed, thread_context)
                .await;
        }

        if !addressed.is_empty() {
            let analysis = self.analyzer.analyze_and_record(message).await?;
            if !analysis.lines.is_empty() {
                return Ok(PipelineAction::MentionsRecorded(analysis));
            }
        }

        if replies > 0 {
            Ok(PipelineAction::RepliesRecorded(replies))
        } else {
            Ok(PipelineAction::Ignored)
        }
    }

    /// Users addressed in the message, from the transport when it supplies
    /// them, re-parsed from the text otherwise.
    fn addressed_users(&self, message: &InboundMessage) -> Vec<String> {
        if !message.addressed_user_ids.is_empty() {
            message.addressed_user_ids.clone()
        } else {
            text::extract_addresses(&message.text)
        }
    }

    async fn handle_assistant_request(
        &self,
        message: &InboundMessage,
        addressed: &[String],
        thread_context: Option<&[Message]>,
    ) -> BadgerResult<PipelineAction> {
        let anchor = message
            .thread_anchor_id
            .as_deref()
            .unwrap_or(&message.message_id);
        let (marker, stripped) = prepare_text(&message.text);
        let context_text = thread_context
            .filter(|messages| !messages.is_empty())
            .map(format_messages);

        let outcome = self
            .classifier
            .classify(&stripped, context_text.as_deref())
            .await;
        if let Outcome::Degraded { reason, .. } = &outcome {
            debug!(reason = %reason, "classification degraded");
        }
        let result = outcome.into_value();
        info!(
            intent = %result.intent,
            confidence = result.confidence,
            "message classified"
        );

        match result.intent {
            Intent::TaskRequest if self.classifier.is_confident(&result) => {
                self.create_work_item(message, addressed, anchor, &stripped, marker, thread_context)
                    .await
            }
            Intent::TaskRequest => {
                self.post(message, anchor, CONFIRM_PROMPT).await;
                Ok(PipelineAction::ConfirmationRequested {
                    intent: result.intent,
                    confidence: result.confidence,
                })
            }
            Intent::ReminderSetup => self.setup_reminder(message, anchor, &stripped).await,
            Intent::ReminderCancel => {
                self.post(message, anchor, "Okay, consider that reminder cancelled.")
                    .await;
                Ok(PipelineAction::ReminderCancelRequested)
            }
            Intent::Information => {
                self.answer_question(message, anchor, &stripped, context_text.as_deref())
                    .await
            }
            Intent::Help => {
                self.post(message, anchor, HELP_TEXT).await;
                Ok(PipelineAction::HelpShown)
            }
        }
    }

    async fn create_work_item(
        &self,
        message: &InboundMessage,
        addressed: &[String],
        anchor: &str,
        stripped: &str,
        marker: Option<Priority>,
        thread_context: Option<&[Message]>,
    ) -> BadgerResult<PipelineAction> {
        // Duplicate transport delivery is tolerated: one open item per
        // origin anchor
        let open = WorkItemFilter::default().with_status(WorkItemStatus::Open);
        if let Some(existing) = self.work_items.list(&open)?.into_iter().find(|item| {
            item.origin_conversation == message.conversation_id
                && item.origin_message_id == anchor
        }) {
            debug!(id = %existing.id, "work item already tracked for this anchor");
            return Ok(PipelineAction::CreatedWorkItem(existing));
        }

        let draft = self.extractor.extract(stripped, Utc::now()).await;
        if let Outcome::Degraded { reason, .. } = &draft {
            warn!(reason = %reason, "task extraction degraded");
        }
        let draft = draft.into_value();

        let priority = self
            .priorities
            .determine(stripped, draft.due_at, marker)
            .await
            .into_value();

        // Assignee: whoever was addressed, else the busiest thread
        // participant, else the author themselves.
        let assignee = addressed
            .iter()
            .find(|id| **id != self.bot_user_id)
            .cloned()
            .or_else(|| {
                thread_context.and_then(|messages| {
                    suggest_assignee(
                        messages.iter().filter_map(|m| m.name.as_deref()),
                        &self.bot_user_id,
                    )
                })
            })
            .unwrap_or_else(|| message.author_id.clone());

        let mut item = WorkItem::new(
            &draft.title,
            &message.conversation_id,
            anchor,
            &message.author_id,
        )
        .with_assignee(assignee)
        .with_priority(priority);
        if let Some(due) = draft.due_at {
            item = item.with_due_at(due);
        }
        if let Some(context) = thread_context.filter(|messages| !messages.is_empty()) {
            let summary = self.extractor.summarize_thread(context).await.into_value();
            if !summary.is_empty() {
                item = item.with_summary(summary);
            }
        }

        if let Err(e) = self.work_items.create(&item) {
            self.post(message, anchor, SAVE_FAILURE_NOTICE).await;
            return Err(e);
        }
        info!(
            id = %item.id,
            assignee = ?item.assignee,
            priority = %item.priority,
            due_at = ?item.due_at,
            "work item created"
        );

        self.post(message, anchor, &confirmation_text(&item)).await;
        Ok(PipelineAction::CreatedWorkItem(item))
    }

    async fn setup_reminder(
        &self,
        message: &InboundMessage,
        anchor: &str,
        stripped: &str,
    ) -> BadgerResult<PipelineAction> {
        let outcome = self
            .extractor
            .parse_reminder_request(stripped, Utc::now())
            .await;
        if let Outcome::Degraded { reason, .. } = &outcome {
            warn!(reason = %reason, "reminder parsing degraded");
        }
        let request = outcome.into_value();

        let ack = match request.remind_at {
            Some(at) => format!(
                "Okay, I'll remind you about \"{}\" at {}.",
                request.title,
                at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => "I couldn't work out when to remind you. Try something like \"remind me tomorrow at 9am to review the draft\".".to_string(),
        };
        self.post(message, anchor, &ack).await;
        Ok(PipelineAction::ReminderRequested(request))
    }

    async fn answer_question(
        &self,
        message: &InboundMessage,
        anchor: &str,
        stripped: &str,
        context: Option<&str>,
    ) -> BadgerResult<PipelineAction> {
        let question = match context {
            Some(context) => format!("Thread so far:\n{context}\n\nQuestion: {stripped}"),
            None => stripped.to_string(),
        };
        let messages = [Message::system(ANSWER_SYSTEM), Message::user(question)];

        match self
            .inference
            .generate(
                &messages,
                Some(InferenceOptions::default().with_temperature(0.3)),
            )
            .await
        {
            Ok(response) => {
                let answer = response.content_or_empty().trim();
                if answer.is_empty() {
                    self.post(message, anchor, ANSWER_APOLOGY).await;
                } else {
                    self.post(message, anchor, answer).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "answer inference failed");
                self.post(message, anchor, ANSWER_APOLOGY).await;
            }
        }
        Ok(PipelineAction::Answered)
    }

    /// Post a reply into the message's thread, logging delivery failures.
    async fn post(&self, message: &InboundMessage, anchor: &str, text: &str) {
        if let Err(e) = self
            .notifier
            .post(&message.conversation_id, text, Some(anchor))
            .await
        {
            warn!(error = %e, conversation = %message.conversation_id, "failed to post reply");
        }
    }
}

/// Strip addresses and the priority marker, returning the marker (if any)
/// and the cleaned text.
fn prepare_text(raw: &str) -> (Option<Priority>, String) {
    let marker = text::detect_priority_marker(raw);
    let mut cleaned = text::strip_addresses(raw);
    if let Some((_, marker_text)) = marker {
        cleaned = text::strip_marker(&cleaned, marker_text);
    }
    (
        marker.map(|(priority, _)| priority),
        text::normalize_whitespace(&cleaned),
    )
}

fn confirmation_text(item: &WorkItem) -> String {
    let mut text = format!("Got it. Tracking \"{}\"", item.text);
    if let Some(assignee) = &item.assignee {
        text.push_str(&format!(" for <@{assignee}>"));
    }
    if let Some(due) = item.due_at {
        text.push_str(&format!(", due {}", due.format("%Y-%m-%d %H:%M UTC")));
    }
    text.push_str(&format!(" ({} priority).", item.priority));
    text
}

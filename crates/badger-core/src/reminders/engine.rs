//! Deadline and escalation sweeps.
//!
//! Sweeps are wall-clock scans over the stores, not an event loop. Each
//! sweep fetches its matching items, runs the throttle gate, posts
//! notifications, and reports counts. Items are processed sequentially and
//! failures are isolated: one bad item never aborts the rest of the sweep.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::BadgerResult;
use crate::mentions::MentionTracker;
use crate::reminders::NotificationThrottle;
use crate::store::WorkItemStore;
use crate::traits::Notifier;
use crate::types::{Mention, Priority, WorkItem};

/// Outcome of processing one item inside a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A notification went out for the item.
    Notified,
    /// The item was passed over: throttled, or an escalation lost to a
    /// reply.
    Skipped,
    /// The item's notification or escalation failed.
    Failed,
}

/// Counts from one sweep run. Per-item outcomes are collected here; no
/// single outcome ever aborts the rest of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Items the sweep's store query matched.
    pub matched: usize,
    /// Notifications actually sent.
    pub notified: usize,
    /// Items passed over.
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
}

impl SweepReport {
    /// Report covering `matched` items, with no outcomes recorded yet.
    pub fn matching(matched: usize) -> Self {
        Self {
            matched,
            ..Default::default()
        }
    }

    /// Record one item's outcome.
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Notified => self.notified += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

/// Runs the deadline, overdue, and escalation sweeps.
pub struct ReminderEngine {
    work_items: Arc<dyn WorkItemStore>,
    tracker: MentionTracker,
    notifier: Arc<dyn Notifier>,
    throttle: Arc<NotificationThrottle>,
}

impl ReminderEngine {
    pub fn new(
        work_items: Arc<dyn WorkItemStore>,
        tracker: MentionTracker,
        notifier: Arc<dyn Notifier>,
        throttle: Arc<NotificationThrottle>,
    ) -> Self {
        Self {
            work_items,
            tracker,
            notifier,
            throttle,
        }
    }

    /// Notify about open items due inside `[now, now + hours_ahead]`.
    pub async fn sweep_upcoming(&self, hours_ahead: i64) -> BadgerResult<SweepReport> {
        let items = self.work_items.list_upcoming(hours_ahead)?;
        let report = self.notify_items(&items, deadline_notice).await;
        self.throttle.prune();
        info!(
            horizon_hours = hours_ahead,
            matched = report.matched,
            notified = report.notified,
            skipped = report.skipped,
            failed = report.failed,
            "upcoming sweep finished"
        );
        Ok(report)
    }

    /// Notify about open items whose deadline has passed.
    pub async fn sweep_overdue(&self) -> BadgerResult<SweepReport> {
        let items = self.work_items.list_overdue()?;
        let report = self.notify_items(&items, overdue_notice).await;
        self.throttle.prune();
        info!(
            matched = report.matched,
            notified = report.notified,
            skipped = report.skipped,
            failed = report.failed,
            "overdue sweep finished"
        );
        Ok(report)
    }

    /// Escalate mentions unresolved for at least `age_threshold_hours` into
    /// work items, notifying the addressed user in the origin thread.
    ///
    /// Escalation is once-per-mention by construction (the store flips the
    /// mention's escalated flag), so this sweep does not use the throttle.
    /// A skipped count here means the mention resolved or escalated between
    /// the fetch and the write.
    pub async fn sweep_escalations(&self, age_threshold_hours: i64) -> BadgerResult<SweepReport> {
        let mentions = self.tracker.unresolved_mentions(age_threshold_hours)?;
        let mut report = SweepReport::matching(mentions.len());

        for mention in &mentions {
            let outcome = match self.tracker.escalate(mention) {
                Ok(Some(item)) => {
                    let text = escalation_notice(mention, &item);
                    match self
                        .notifier
                        .post(&mention.conversation, &text, Some(&mention.anchor_message_id))
                        .await
                    {
                        Ok(()) => ItemOutcome::Notified,
                        Err(e) => {
                            warn!(error = %e, mention = %mention.id, "escalation notice failed");
                            ItemOutcome::Failed
                        }
                    }
                }
                Ok(None) => ItemOutcome::Skipped,
                Err(e) => {
                    warn!(error = %e, mention = %mention.id, "escalation failed");
                    ItemOutcome::Failed
                }
            };
            report.record(outcome);
        }

        info!(
            age_threshold_hours,
            matched = report.matched,
            notified = report.notified,
            skipped = report.skipped,
            failed = report.failed,
            "escalation sweep finished"
        );
        Ok(report)
    }

    /// Nudge addressed users about mentions still waiting on them, without
    /// escalating. Throttled per mention id in the same keyspace as the
    /// deadline sweeps.
    pub async fn sweep_mention_reminders(
        &self,
        age_threshold_hours: i64,
    ) -> BadgerResult<SweepReport> {
        let mentions = self.tracker.unresolved_mentions(age_threshold_hours)?;
        let mut report = SweepReport::matching(mentions.len());

        for mention in &mentions {
            if !self.throttle.can_notify(&mention.id) {
                debug!(id = %mention.id, "mention nudge throttled");
                report.record(ItemOutcome::Skipped);
                continue;
            }
            let text = mention_nudge(mention);
            let outcome = match self
                .notifier
                .post(&mention.conversation, &text, Some(&mention.anchor_message_id))
                .await
            {
                Ok(()) => {
                    self.throttle.record_notified(&mention.id);
                    ItemOutcome::Notified
                }
                Err(e) => {
                    warn!(error = %e, id = %mention.id, "mention nudge failed");
                    ItemOutcome::Failed
                }
            };
            report.record(outcome);
        }

        self.throttle.prune();
        info!(
            age_threshold_hours,
            matched = report.matched,
            notified = report.notified,
            skipped = report.skipped,
            failed = report.failed,
            "mention reminder sweep finished"
        );
        Ok(report)
    }

    async fn notify_items(
        &self,
        items: &[WorkItem],
        compose: fn(&WorkItem) -> String,
    ) -> SweepReport {
        let mut report = SweepReport::matching(items.len());

        for item in items {
            if !self.throttle.can_notify(&item.id) {
                debug!(id = %item.id, "notification throttled");
                report.record(ItemOutcome::Skipped);
                continue;
            }
            let text = compose(item);
            let outcome = match self
                .notifier
                .post(&item.origin_conversation, &text, item.thread_anchor())
                .await
            {
                Ok(()) => {
                    // Only a delivered notification consumes the cooldown
                    self.throttle.record_notified(&item.id);
                    ItemOutcome::Notified
                }
                Err(e) => {
                    warn!(error = %e, id = %item.id, "reminder notification failed");
                    ItemOutcome::Failed
                }
            };
            report.record(outcome);
        }

        report
    }
}

fn priority_flag(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴 ",
        Priority::Medium | Priority::Low => "",
    }
}

fn assignee_prefix(item: &WorkItem) -> String {
    match &item.assignee {
        Some(assignee) => format!("<@{assignee}> "),
        None => String::new(),
    }
}

fn deadline_notice(item: &WorkItem) -> String {
    let due = match item.due_at {
        Some(due) => format!("due {}", due.format("%Y-%m-%d %H:%M UTC")),
        None => "due soon".to_string(),
    };
    format!(
        "{}{}Reminder: \"{}\" is {}.",
        assignee_prefix(item),
        priority_flag(item.priority),
        item.text,
        due
    )
}

fn overdue_notice(item: &WorkItem) -> String {
    let was_due = match item.due_at {
        Some(due) => format!("was due {}", due.format("%Y-%m-%d %H:%M UTC")),
        None => "is overdue".to_string(),
    };
    format!(
        "{}{}Overdue: \"{}\" {}. Is it done, or does the deadline need to move?",
        assignee_prefix(item),
        priority_flag(item.priority),
        item.text,
        was_due
    )
}

fn escalation_notice(mention: &Mention, item: &WorkItem) -> String {
    format!(
        "<@{}> This is still waiting on your reply, so I filed it as a task ({}) to keep track of it.",
        mention.addressed_user, item.id
    )
}

fn mention_nudge(mention: &Mention) -> String {
    format!(
        "<@{}> Gentle nudge: this message is still waiting on your reply.",
        mention.addressed_user
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BadgerError;
    use crate::store::{SqliteMentionStore, SqliteWorkItemStore};
    use crate::types::{manual_origin_id, NewMention};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        posts: Mutex<Vec<(String, String, Option<String>)>>,
        failures_left: AtomicUsize,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing_first(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                posts: Mutex::new(Vec::new()),
                failures_left: AtomicUsize::new(failures),
            })
        }

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
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(BadgerError::notification("sink unavailable"));
            }
            self.posts.lock().unwrap().push((
                conversation_id.to_string(),
                text.to_string(),
                thread_anchor_id.map(|a| a.to_string()),
            ));
            Ok(())
        }
    }

    struct Fixture {
        engine: ReminderEngine,
        work_items: Arc<SqliteWorkItemStore>,
        tracker: MentionTracker,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture_with(notifier: Arc<RecordingNotifier>) -> Fixture {
        let work_items = Arc::new(SqliteWorkItemStore::in_memory().unwrap());
        let mentions = Arc::new(SqliteMentionStore::in_memory().unwrap());
        let tracker = MentionTracker::new(mentions, work_items.clone());
        let engine = ReminderEngine::new(
            work_items.clone(),
            tracker.clone(),
            notifier.clone(),
            Arc::new(NotificationThrottle::default()),
        );
        Fixture {
            engine,
            work_items,
            tracker,
            notifier,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingNotifier::new())
    }

    fn seed_item(fx: &Fixture, text: &str, due_in_hours: i64) -> WorkItem {
        let item = WorkItem::new(text, "C01", "1700000000.000100", "U_ALICE")
            .with_assignee("U_BOB")
            .with_due_at(Utc::now() + Duration::hours(due_in_hours));
        fx.work_items.create(&item).unwrap();
        item
    }

    #[tokio::test]
    async fn test_upcoming_sweep_notifies_once_per_cooldown() {
        let fx = fixture();
        seed_item(&fx, "send the report", 2);

        let first = fx.engine.sweep_upcoming(24).await.unwrap();
        let second = fx.engine.sweep_upcoming(24).await.unwrap();

        assert_eq!(first.notified, 1);
        assert_eq!(second.notified, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(fx.notifier.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_hourly_and_daily_sweeps_share_the_gate() {
        let fx = fixture();
        seed_item(&fx, "send the report", 2);

        // Narrow then wide horizon matching the same item in one window
        fx.engine.sweep_upcoming(3).await.unwrap();
        let wide = fx.engine.sweep_upcoming(24).await.unwrap();

        assert_eq!(wide.skipped, 1);
        assert_eq!(fx.notifier.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_post_does_not_consume_cooldown() {
        let fx = fixture_with(RecordingNotifier::failing_first(1));
        seed_item(&fx, "send the report", 2);

        let first = fx.engine.sweep_upcoming(24).await.unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(first.notified, 0);

        let second = fx.engine.sweep_upcoming(24).await.unwrap();
        assert_eq!(second.notified, 1);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_sweep() {
        let fx = fixture_with(RecordingNotifier::failing_first(1));
        seed_item(&fx, "first", 1);
        seed_item(&fx, "second", 2);

        let report = fx.engine.sweep_upcoming(24).await.unwrap();
        assert_eq!(report.matched, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.notified, 1);
    }

    #[tokio::test]
    async fn test_overdue_threading_follows_origin() {
        let fx = fixture();
        seed_item(&fx, "from chat", -3);
        let manual = WorkItem::new("registered by hand", "C02", manual_origin_id(), "U_ALICE")
            .with_due_at(Utc::now() - Duration::hours(1));
        fx.work_items.create(&manual).unwrap();

        let report = fx.engine.sweep_overdue().await.unwrap();
        assert_eq!(report.notified, 2);

        let posts = fx.notifier.posts();
        let chat_post = posts.iter().find(|(c, _, _)| c == "C01").unwrap();
        let manual_post = posts.iter().find(|(c, _, _)| c == "C02").unwrap();
        assert_eq!(chat_post.2.as_deref(), Some("1700000000.000100"));
        assert!(manual_post.2.is_none());
        assert!(chat_post.1.contains("Overdue"));
    }

    #[tokio::test]
    async fn test_escalation_sweep_files_task_and_notifies_thread() {
        let fx = fixture();
        fx.tracker
            .record_mention(&NewMention::new(
                "C01",
                "1700000000.000100",
                "U_BOB",
                "U_ALICE",
                "send the numbers",
            ))
            .unwrap();

        let report = fx.engine.sweep_escalations(0).await.unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.notified, 1);

        let posts = fx.notifier.posts();
        assert_eq!(posts[0].0, "C01");
        assert_eq!(posts[0].2.as_deref(), Some("1700000000.000100"));
        assert!(posts[0].1.contains("<@U_BOB>"));

        // The mention no longer matches, so a second sweep is a no-op
        let second = fx.engine.sweep_escalations(0).await.unwrap();
        assert_eq!(second.matched, 0);
    }

    #[tokio::test]
    async fn test_replied_mention_is_not_nudged() {
        let fx = fixture();
        fx.tracker
            .record_mention(&NewMention::new(
                "C01",
                "1700000000.000100",
                "U_BOB",
                "U_ALICE",
                "send the numbers",
            ))
            .unwrap();
        fx.tracker
            .mark_replied("C01", "1700000000.000100", "U_BOB")
            .unwrap();

        let report = fx.engine.sweep_mention_reminders(0).await.unwrap();
        assert_eq!(report.matched, 0);
        assert!(fx.notifier.posts().is_empty());
    }

    #[tokio::test]
    async fn test_mention_nudges_are_throttled() {
        let fx = fixture();
        fx.tracker
            .record_mention(&NewMention::new(
                "C01",
                "1700000000.000100",
                "U_BOB",
                "U_ALICE",
                "send the numbers",
            ))
            .unwrap();

        let first = fx.engine.sweep_mention_reminders(0).await.unwrap();
        let second = fx.engine.sweep_mention_reminders(0).await.unwrap();
        assert_eq!(first.notified, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(fx.notifier.posts().len(), 1);
    }

    #[test]
    fn test_notice_texts() {
        let due = Utc::now() + Duration::hours(2);
        let item = WorkItem::new("send the report", "C01", "1.0", "U_ALICE")
            .with_assignee("U_BOB")
            .with_priority(Priority::High)
            .with_due_at(due);

        let notice = deadline_notice(&item);
        assert!(notice.starts_with("<@U_BOB> 🔴 Reminder:"));
        assert!(notice.contains("send the report"));

        let unassigned = WorkItem::new("tidy backlog", "C01", "1.0", "U_ALICE");
        assert!(!deadline_notice(&unassigned).contains("<@"));
    }

    #[test]
    fn test_report_records_each_outcome() {
        let mut report = SweepReport::matching(3);
        report.record(ItemOutcome::Notified);
        report.record(ItemOutcome::Skipped);
        report.record(ItemOutcome::Failed);
        assert_eq!(report.matched, 3);
        assert_eq!(report.notified, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
    }
}

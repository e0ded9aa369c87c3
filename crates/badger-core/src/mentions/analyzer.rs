//! Multi-subject message splitting.
//!
//! One inbound message can address several users on separate lines, each
//! with its own ask and its own priority marker. Lines are analyzed
//! independently: addresses and the marker are stripped to produce the
//! canonical stored text, an optional model judgment filters out lines that
//! are not actionable asks, and one mention is recorded per addressed user
//! on the line.

use tracing::warn;

use crate::classify::TaskJudge;
use crate::error::BadgerResult;
use crate::mentions::MentionTracker;
use crate::text;
use crate::types::{InboundMessage, NewMention, Outcome, Priority};

/// Per-line breakdown of a single analyzed message.
#[derive(Debug, Clone)]
pub struct LineAnalysis {
    /// Canonical stored text: the line without address tokens or marker.
    pub text: String,
    pub addressed_users: Vec<String>,
    pub priority: Priority,
    /// Whether the line was judged an actionable ask.
    pub actionable: bool,
    /// New (non-duplicate) mentions recorded from this line.
    pub recorded: usize,
    /// Fallback reason when the judgment call degraded.
    pub degraded: Option<String>,
}

/// Aggregate result of analyzing one inbound message.
#[derive(Debug, Clone, Default)]
pub struct MentionAnalysis {
    /// True when at least one line was an actionable ask.
    pub is_task: bool,
    /// Total new mentions recorded across all lines.
    pub recorded: usize,
    pub lines: Vec<LineAnalysis>,
}

/// Splits inbound messages into per-line mentions and records them.
pub struct MentionAnalyzer {
    tracker: MentionTracker,
    judge: Option<TaskJudge>,
}

impl MentionAnalyzer {
    /// Analyzer without line classification: every addressed line is
    /// treated as an actionable ask.
    pub fn new(tracker: MentionTracker) -> Self {
        Self {
            tracker,
            judge: None,
        }
    }

    /// Analyzer that filters lines through a task judgment first.
    pub fn with_judge(tracker: MentionTracker, judge: TaskJudge) -> Self {
        Self {
            tracker,
            judge: Some(judge),
        }
    }

    /// Analyze a message line by line and record a mention for each
    /// addressed user on each actionable line. Mentions anchor on the
    /// thread the message belongs to, or on the message itself when it
    /// starts a new thread.
    pub async fn analyze_and_record(
        &self,
        message: &InboundMessage,
    ) -> BadgerResult<MentionAnalysis> {
        let anchor = message
            .thread_anchor_id
            .as_deref()
            .unwrap_or(&message.message_id);
        let mut analysis = MentionAnalysis::default();

        for line in message.text.lines() {
            let addressed = text::extract_addresses(line);
            if addressed.is_empty() {
                continue;
            }

            let (priority, marker) = text::detect_priority_marker(line)
                .map(|(priority, marker)| (priority, Some(marker)))
                .unwrap_or((Priority::Medium, None));
            let mut stored = text::strip_addresses(line);
            if let Some(marker) = marker {
                stored = text::strip_marker(&stored, marker);
            }
            let stored = text::normalize_whitespace(&stored);

            let (actionable, degraded) = self.judge_line(&stored).await;
            let mut recorded = 0;
            if actionable {
                for user in &addressed {
                    let observation = NewMention::new(
                        &message.conversation_id,
                        anchor,
                        user,
                        &message.author_id,
                        &stored,
                    )
                    .with_priority(priority);
                    match self.tracker.record_mention(&observation) {
                        Ok(Some(_)) => recorded += 1,
                        // Duplicate triple, already logged by the tracker
                        Ok(None) => {}
                        Err(e) => {
                            warn!(error = %e, user = %user, "failed to record mention")
                        }
                    }
                }
            }

            analysis.is_task |= actionable;
            analysis.recorded += recorded;
            analysis.lines.push(LineAnalysis {
                text: stored,
                addressed_users: addressed,
                priority,
                actionable,
                recorded,
                degraded,
            });
        }

        Ok(analysis)
    }

    async fn judge_line(&self, line_text: &str) -> (bool, Option<String>) {
        let Some(judge) = &self.judge else {
            return (true, None);
        };
        match judge.judge(line_text).await {
            Outcome::Ok(judgment) => (judgment.is_actionable(), None),
            Outcome::Degraded { value, reason } => {
                warn!(reason = %reason, "task judgment degraded, skipping line");
                (value.is_actionable(), Some(reason))
            }
        }
    }
}

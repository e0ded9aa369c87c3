//! Mention lifecycle tracking.
//!
//! Records who was addressed and is expected to respond, resolves mentions
//! when the addressed user replies, and escalates long-unresolved mentions
//! into work items. Escalation idempotency is anchored on the mention row:
//! the conditional `mark_escalated` write decides whether the created work
//! item is kept, so a sweep can never produce two items for one mention.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::BadgerResult;
use crate::store::{MentionStore, WorkItemStore};
use crate::types::{Mention, MentionState, MentionStats, NewMention, WorkItem};

/// Creator recorded on work items produced by escalation.
pub const ESCALATION_CREATOR: &str = "auto_system";

/// Prefix added to escalated mention texts.
pub const ESCALATION_PREFIX: &str = "[unanswered] ";

/// Tracks mention state across reply and escalation transitions.
#[derive(Clone)]
pub struct MentionTracker {
    mentions: Arc<dyn MentionStore>,
    work_items: Arc<dyn WorkItemStore>,
}

impl MentionTracker {
    pub fn new(mentions: Arc<dyn MentionStore>, work_items: Arc<dyn WorkItemStore>) -> Self {
        Self {
            mentions,
            work_items,
        }
    }

    /// Record an observed mention. Returns `None` when the same triple was
    /// already recorded; callers treat that as a no-op, not an error.
    pub fn record_mention(&self, new: &NewMention) -> BadgerResult<Option<Mention>> {
        let recorded = self.mentions.insert(new)?;
        match &recorded {
            Some(mention) => {
                debug!(id = %mention.id, user = %mention.addressed_user, "mention recorded")
            }
            None => debug!(user = %new.addressed_user, "duplicate mention ignored"),
        }
        Ok(recorded)
    }

    /// Resolve the replying user's pending mentions in the given thread.
    pub fn mark_replied(
        &self,
        conversation: &str,
        anchor_message_id: &str,
        replied_user: &str,
    ) -> BadgerResult<Vec<Mention>> {
        let resolved = self.mentions.update_reply_state(
            conversation,
            anchor_message_id,
            replied_user,
            Utc::now(),
        )?;
        if !resolved.is_empty() {
            debug!(
                count = resolved.len(),
                user = replied_user,
                "mentions resolved by reply"
            );
        }
        Ok(resolved)
    }

    /// Unresolved mentions at least `age_threshold_hours` old; 0 returns all
    /// of them.
    pub fn unresolved_mentions(&self, age_threshold_hours: i64) -> BadgerResult<Vec<Mention>> {
        self.mentions.list_unresolved(age_threshold_hours)
    }

    /// Escalate an unresolved mention into a work item.
    ///
    /// Returns `Ok(None)` when there is nothing to do: the mention was
    /// already resolved or escalated, or a reply landed between our read and
    /// the escalation write (the reply wins and the freshly created work
    /// item is discarded).
    pub fn escalate(&self, mention: &Mention) -> BadgerResult<Option<WorkItem>> {
        match self.mentions.get_by_id(&mention.id)? {
            Some(current) if current.state() == MentionState::Unresolved => {}
            Some(current) => {
                debug!(id = %mention.id, state = %current.state(), "mention no longer unresolved, skipping escalation");
                return Ok(None);
            }
            None => {
                warn!(id = %mention.id, "mention missing at escalation time");
                return Ok(None);
            }
        }

        let item = WorkItem::new(
            format!("{}{}", ESCALATION_PREFIX, mention.text),
            &mention.conversation,
            &mention.anchor_message_id,
            ESCALATION_CREATOR,
        )
        .with_assignee(&mention.addressed_user)
        .with_priority(mention.priority);
        self.work_items.create(&item)?;

        let marked = match self.mentions.mark_escalated(&mention.id, &item.id) {
            Ok(marked) => marked,
            Err(e) => {
                warn!(error = %e, id = %mention.id, "escalation mark failed, retrying");
                match self.mentions.mark_escalated(&mention.id, &item.id) {
                    Ok(marked) => marked,
                    Err(e) => {
                        self.discard_escalation_item(&item.id);
                        return Err(e);
                    }
                }
            }
        };

        if marked {
            info!(mention = %mention.id, work_item = %item.id, "mention escalated");
            Ok(Some(item))
        } else {
            // A reply landed between the read and the write; the reply wins
            warn!(id = %mention.id, "reply raced escalation, discarding work item");
            self.discard_escalation_item(&item.id);
            Ok(None)
        }
    }

    /// Aggregate mention counts. A failed count degrades to zero for that
    /// field instead of failing the call, so `total` is always the sum of
    /// the three counts actually reported.
    pub fn stats(&self) -> MentionStats {
        let unresolved = self.count_or_zero(MentionState::Unresolved);
        let replied = self.count_or_zero(MentionState::Replied);
        let escalated = self.count_or_zero(MentionState::Escalated);
        MentionStats {
            unresolved,
            replied,
            escalated,
            total: unresolved + replied + escalated,
        }
    }

    fn count_or_zero(&self, state: MentionState) -> u64 {
        match self.mentions.count_by(state) {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, state = %state, "mention count failed, reporting zero");
                0
            }
        }
    }

    fn discard_escalation_item(&self, id: &str) {
        if let Err(e) = self.work_items.delete(id) {
            warn!(error = %e, id, "failed to discard orphaned escalation item");
        }
    }
}

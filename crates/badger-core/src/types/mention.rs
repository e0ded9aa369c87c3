//! Mention tracking types.
//!
//! A mention records that someone addressed a user in a conversation and is
//! waiting on them. Each (conversation, anchor message, addressed user)
//! triple is tracked at most once; answering the thread resolves it, and
//! mentions that stay unresolved long enough get escalated into work items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::work_item::Priority;

/// Resolution state of a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MentionState {
    /// Nobody has replied yet.
    Unresolved,
    /// The addressed user answered in the thread.
    Replied,
    /// Turned into a work item after going unanswered.
    Escalated,
}

/// A recorded mention awaiting a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    /// Unique identifier.
    pub id: String,
    /// Conversation the mention happened in.
    pub conversation: String,
    /// Message the mention is anchored to (thread root for replies).
    pub anchor_message_id: String,
    /// User being waited on.
    pub addressed_user: String,
    /// User who asked.
    pub asking_user: String,
    /// Mention text with addresses and priority markers stripped.
    pub text: String,
    /// Priority detected from markers on the mention line.
    pub priority: Priority,
    /// When the mention was recorded.
    pub recorded_at: DateTime<Utc>,
    /// When the addressed user replied, if they did.
    pub replied_at: Option<DateTime<Utc>>,
    /// Whether the mention was escalated into a work item.
    pub escalated: bool,
    /// Id of the work item created by escalation, if any.
    pub work_item_id: Option<String>,
}

impl Mention {
    /// Current resolution state. A reply takes precedence over escalation.
    pub fn state(&self) -> MentionState {
        if self.replied_at.is_some() {
            MentionState::Replied
        } else if self.escalated {
            MentionState::Escalated
        } else {
            MentionState::Unresolved
        }
    }
}

/// Input for recording a new mention.
#[derive(Debug, Clone)]
pub struct NewMention {
    pub conversation: String,
    pub anchor_message_id: String,
    pub addressed_user: String,
    pub asking_user: String,
    pub text: String,
    pub priority: Priority,
}

impl NewMention {
    /// Create a new mention record with medium priority.
    pub fn new(
        conversation: impl Into<String>,
        anchor_message_id: impl Into<String>,
        addressed_user: impl Into<String>,
        asking_user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation: conversation.into(),
            anchor_message_id: anchor_message_id.into(),
            addressed_user: addressed_user.into(),
            asking_user: asking_user.into(),
            text: text.into(),
            priority: Priority::Medium,
        }
    }

    /// Set the detected priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Aggregate counts over tracked mentions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MentionStats {
    pub unresolved: u64,
    pub replied: u64,
    pub escalated: u64,
    pub total: u64,
}

//! Work item types.
//!
//! A work item is a unit of tracked work extracted from a chat message (or
//! registered manually). Items carry their origin coordinates so follow-up
//! notifications can be threaded back onto the conversation they came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Origin prefix for items registered outside any conversation.
pub const MANUAL_ORIGIN_PREFIX: &str = "manual-";

/// Priority level of a work item.
///
/// Stored as the numeric codes 1 (high) through 3 (low).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    /// Urgent work, surfaced first.
    High,
    /// Normal work.
    #[default]
    Medium,
    /// Background work.
    Low,
}

impl Priority {
    /// Numeric code used in storage and extraction payloads.
    pub fn code(&self) -> i64 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// Parse a numeric code back into a priority.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Priority::High),
            2 => Some(Priority::Medium),
            3 => Some(Priority::Low),
            _ => None,
        }
    }
}

/// Lifecycle status of a work item.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkItemStatus {
    /// Still being worked on.
    #[default]
    Open,
    /// Done.
    Completed,
}

/// A tracked unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier, `task-<uuid>`.
    pub id: String,
    /// Short description of the work.
    pub text: String,
    /// Current lifecycle status.
    pub status: WorkItemStatus,
    /// User responsible for the work, if known.
    pub assignee: Option<String>,
    /// User (or system actor) that registered the item.
    pub created_by: String,
    /// Conversation the item originated from.
    pub origin_conversation: String,
    /// Message the item originated from, or a `manual-` marker.
    pub origin_message_id: String,
    /// Deadline, if one was stated or extracted.
    pub due_at: Option<DateTime<Utc>>,
    /// Priority level.
    pub priority: Priority,
    /// Optional longer summary of the surrounding discussion.
    pub summary: Option<String>,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When the item was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the item was completed, if it was.
    pub completed_at: Option<DateTime<Utc>>,
    /// Who completed the item, if anyone.
    pub completed_by: Option<String>,
}

impl WorkItem {
    /// Create a new open work item with a generated id.
    pub fn new(
        text: impl Into<String>,
        origin_conversation: impl Into<String>,
        origin_message_id: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("task-{}", Uuid::new_v4()),
            text: text.into(),
            status: WorkItemStatus::Open,
            assignee: None,
            created_by: created_by.into(),
            origin_conversation: origin_conversation.into(),
            origin_message_id: origin_message_id.into(),
            due_at: None,
            priority: Priority::Medium,
            summary: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            completed_by: None,
        }
    }

    /// Set the assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Set the deadline.
    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Whether the item is still open.
    pub fn is_open(&self) -> bool {
        self.status == WorkItemStatus::Open
    }

    /// Message id to thread follow-up notices on, if the item came from a
    /// conversation. Manually registered items have no thread anchor.
    pub fn thread_anchor(&self) -> Option<&str> {
        if self.origin_message_id.starts_with(MANUAL_ORIGIN_PREFIX) {
            None
        } else {
            Some(&self.origin_message_id)
        }
    }
}

/// Generate an origin marker for a manually registered item.
pub fn manual_origin_id() -> String {
    format!("{}{}", MANUAL_ORIGIN_PREFIX, Utc::now().timestamp_millis())
}

/// Filter for listing work items.
#[derive(Debug, Clone, Default)]
pub struct WorkItemFilter {
    /// Only items with this status.
    pub status: Option<WorkItemStatus>,
    /// Only items assigned to this user.
    pub assignee: Option<String>,
    /// Only items registered by this user.
    pub created_by: Option<String>,
    /// Maximum number of items to return.
    pub limit: Option<usize>,
}

impl WorkItemFilter {
    /// Filter by status.
    pub fn with_status(mut self, status: WorkItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Filter by creator.
    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    /// Limit the number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Partial update applied to an existing work item.
///
/// `None` fields are left unchanged. `due_at` uses a nested option so a
/// deadline can be cleared (`Some(None)`) as well as replaced.
#[derive(Debug, Clone, Default)]
pub struct WorkItemUpdate {
    pub text: Option<String>,
    pub assignee: Option<String>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Priority>,
    pub summary: Option<String>,
}

impl WorkItemUpdate {
    /// Replace the description.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Replace the assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Replace the deadline.
    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(Some(due_at));
        self
    }

    /// Clear the deadline.
    pub fn clear_due_at(mut self) -> Self {
        self.due_at = Some(None);
        self
    }

    /// Replace the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replace the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Whether the update changes anything.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.assignee.is_none()
            && self.due_at.is_none()
            && self.priority.is_none()
            && self.summary.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_work_item_defaults() {
        let item = WorkItem::new("write report", "C01", "1700000000.000100", "U_ALICE");
        assert!(item.id.starts_with("task-"));
        assert_eq!(item.status, WorkItemStatus::Open);
        assert_eq!(item.priority, Priority::Medium);
        assert!(item.assignee.is_none());
        assert!(item.due_at.is_none());
        assert!(item.is_open());
    }

    #[test]
    fn test_work_item_ids_are_unique() {
        let a = WorkItem::new("a", "C01", "1.0", "U1");
        let b = WorkItem::new("b", "C01", "1.0", "U1");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_thread_anchor() {
        let from_chat = WorkItem::new("t", "C01", "1700000000.000100", "U1");
        assert_eq!(from_chat.thread_anchor(), Some("1700000000.000100"));

        let manual = WorkItem::new("t", "C01", manual_origin_id(), "U1");
        assert_eq!(manual.thread_anchor(), None);
    }

    #[test]
    fn test_priority_codes() {
        assert_eq!(Priority::High.code(), 1);
        assert_eq!(Priority::from_code(3), Some(Priority::Low));
        assert_eq!(Priority::from_code(0), None);
        assert_eq!(Priority::from_code(4), None);
    }

    #[test]
    fn test_priority_string_forms() {
        assert_eq!(Priority::High.to_string(), "high");
        assert_eq!("medium".parse::<Priority>().ok(), Some(Priority::Medium));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_update_builder() {
        let update = WorkItemUpdate::default()
            .with_text("new title")
            .clear_due_at();
        assert_eq!(update.text.as_deref(), Some("new title"));
        assert_eq!(update.due_at, Some(None));
        assert!(!update.is_empty());
        assert!(WorkItemUpdate::default().is_empty());
    }
}

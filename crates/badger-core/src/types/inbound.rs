//! Inbound chat message representation.

use serde::{Deserialize, Serialize};

/// A message received from the chat platform, normalized for processing.
///
/// Transport envelope parsing happens in the platform adapter; the core only
/// ever sees this shape. `addressed_user_ids` holds every user addressed
/// anywhere in the message; per-line address positions are re-parsed from
/// `text` by the stages that need them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Conversation (channel) the message was posted in.
    pub conversation_id: String,
    /// Platform id of the message itself.
    pub message_id: String,
    /// Root message of the thread, when the message was posted in one.
    pub thread_anchor_id: Option<String>,
    /// Author of the message.
    pub author_id: String,
    /// Raw message text.
    pub text: String,
    /// Users addressed in the message.
    #[serde(default)]
    pub addressed_user_ids: Vec<String>,
}

impl InboundMessage {
    /// Create a top-level message with no addressed users.
    pub fn new(
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
        author_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            thread_anchor_id: None,
            author_id: author_id.into(),
            text: text.into(),
            addressed_user_ids: Vec::new(),
        }
    }

    /// Mark the message as part of a thread rooted at `anchor_id`.
    pub fn with_thread_anchor(mut self, anchor_id: impl Into<String>) -> Self {
        self.thread_anchor_id = Some(anchor_id.into());
        self
    }

    /// Set the addressed users.
    pub fn with_addressed_users(mut self, user_ids: Vec<String>) -> Self {
        self.addressed_user_ids = user_ids;
        self
    }

    /// Whether the given user is addressed in this message.
    pub fn addresses(&self, user_id: &str) -> bool {
        self.addressed_user_ids.iter().any(|id| id == user_id)
    }

    /// Whether this message is a reply inside a thread (as opposed to the
    /// thread root, which carries its own id as the anchor).
    pub fn is_thread_reply(&self) -> bool {
        match &self.thread_anchor_id {
            Some(anchor) => anchor != &self.message_id,
            None => false,
        }
    }
}

//! Core data types.

pub mod inbound;
pub mod mention;
pub mod message;
pub mod outcome;
pub mod work_item;

pub use inbound::InboundMessage;
pub use mention::{Mention, MentionState, MentionStats, NewMention};
pub use message::{format_messages, Message, MessageRole};
pub use outcome::Outcome;
pub use work_item::{
    manual_origin_id, Priority, WorkItem, WorkItemFilter, WorkItemStatus, WorkItemUpdate,
    MANUAL_ORIGIN_PREFIX,
};

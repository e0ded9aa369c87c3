//! Persistence contracts and SQLite adapters.

pub mod mentions;
pub mod work_items;

pub use mentions::{MentionStore, SqliteMentionStore};
pub use work_items::{SqliteWorkItemStore, WorkItemStore};

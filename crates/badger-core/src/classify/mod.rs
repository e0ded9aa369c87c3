//! Intent and task classification.

pub mod intent;
pub mod task;

pub use intent::{Intent, IntentClassifier, IntentResult, DEFAULT_CONFIDENCE_THRESHOLD};
pub use task::{TaskJudge, TaskJudgment, TASK_CONFIDENCE_GATE};

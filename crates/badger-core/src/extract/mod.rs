//! Task extraction and priority resolution.

pub mod priority;
pub mod task_info;

pub use priority::PriorityResolver;
pub use task_info::{
    end_of_day_due, parse_due_string, ReminderRequest, TaskDraft, TaskExtractor,
};

use std::collections::HashMap;

/// Suggest an assignee from thread participants: the most frequent speaker,
/// excluding `exclude` (normally the bot). Ties break on first appearance,
/// so the suggestion is deterministic for a given thread.
pub fn suggest_assignee<'a, I>(speakers: I, exclude: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for speaker in speakers {
        if speaker == exclude {
            continue;
        }
        let count = counts.entry(speaker).or_insert(0);
        if *count == 0 {
            order.push(speaker);
        }
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for speaker in order {
        let count = counts.get(speaker).copied().unwrap_or(0);
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((speaker, count));
        }
    }
    best.map(|(speaker, _)| speaker.to_string())
}

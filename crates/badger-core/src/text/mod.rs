//! Shared text utilities: address tokens, priority markers, and the surface
//! patterns used by the rule-based intent checks.
//!
//! Address tokens use the `<@USERID>` form. Priority markers are the emoji
//! (or emoji shortcode) an author can put on a line:
//! - High: 🔴 / `:red_circle:`
//! - Medium: 🟡 / `:yellow_circle:` / `:large_yellow_circle:`
//! - Low: 🟢 / `:green_circle:` / `:large_green_circle:`

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Priority;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@([A-Z0-9]+)>").unwrap());

// Compiled patterns for the rule-based intent checks
static CANCEL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(cancel|stop|undo|abort|delete)\b").unwrap(),
        Regex::new(r"(?i)\b(never\s?mind|call\s+off)\b").unwrap(),
    ]
});

static REMINDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(remind(?:er)?s?|alert|notify|notification)\b").unwrap(),
        Regex::new(r"(?i)\bping\s+me\b").unwrap(),
    ]
});

static HELP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bhow\s+do\s+i\s+use\b").unwrap(),
        Regex::new(r"(?i)\bhow\s+does\s+this\s+work\b").unwrap(),
        Regex::new(r"(?i)\bwhat\s+can\s+you\s+do\b").unwrap(),
        Regex::new(r"(?i)\bwhat\s+are\s+you\s+able\b").unwrap(),
        Regex::new(r"(?i)^\s*(help|usage)\s*[!?.]*\s*$").unwrap(),
    ]
});

static QUESTION_OPENER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(what|when|who|where|why|how|did|is|are|was)\b").unwrap()
});

static PAST_STATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(did|was|were|happened|decided)\b").unwrap(),
        Regex::new(r"(?i)\b(status|progress)\b").unwrap(),
        Regex::new(r"(?i)\b(last\s+week|yesterday)\b").unwrap(),
    ]
});

static REQUEST_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(please|could\s+you|can\s+you|make\s+sure|need\s+you\s+to)\b").unwrap(),
        Regex::new(r"(?i)\b(prepare|create|send|write|fix|review|update|schedule)\b").unwrap(),
        Regex::new(r"(?i)\bby\s+(today|tomorrow|tonight|monday|tuesday|wednesday|thursday|friday|saturday|sunday|next\s+week|end\s+of|\d)").unwrap(),
    ]
});

/// Priority marker forms, checked in declaration order within each level.
const HIGH_MARKERS: &[&str] = &["🔴", ":red_circle:"];
const MEDIUM_MARKERS: &[&str] = &["🟡", ":yellow_circle:", ":large_yellow_circle:"];
const LOW_MARKERS: &[&str] = &["🟢", ":green_circle:", ":large_green_circle:"];

/// Extract all addressed user ids from `text`, in order of first appearance,
/// without duplicates.
pub fn extract_addresses(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for capture in ADDRESS_RE.captures_iter(text) {
        let id = capture[1].to_string();
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Remove every address token from `text` and normalize whitespace.
pub fn strip_addresses(text: &str) -> String {
    normalize_whitespace(&ADDRESS_RE.replace_all(text, " "))
}

/// Detect the first priority marker on `line`, checking High before Medium
/// before Low. Returns the priority and the matched marker form.
pub fn detect_priority_marker(line: &str) -> Option<(Priority, &'static str)> {
    for (priority, markers) in [
        (Priority::High, HIGH_MARKERS),
        (Priority::Medium, MEDIUM_MARKERS),
        (Priority::Low, LOW_MARKERS),
    ] {
        if let Some(marker) = markers.iter().find(|m| line.contains(**m)) {
            return Some((priority, marker));
        }
    }
    None
}

/// Remove every occurrence of `marker` from `line` and normalize whitespace.
pub fn strip_marker(line: &str, marker: &str) -> String {
    normalize_whitespace(&line.replace(marker, " "))
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate `text` to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Whether `text` contains a cancellation marker.
pub fn has_cancel_marker(text: &str) -> bool {
    CANCEL_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Whether `text` contains a reminder marker.
pub fn has_reminder_marker(text: &str) -> bool {
    REMINDER_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Whether `text` matches a help-intent surface pattern.
pub fn matches_help_pattern(text: &str) -> bool {
    HELP_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Whether `text` reads as a question about past or third-party state.
pub fn is_information_question(text: &str) -> bool {
    let trimmed = text.trim();
    let interrogative = trimmed.ends_with('?') || QUESTION_OPENER_RE.is_match(trimmed);
    interrogative && PAST_STATE_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

/// Whether `text` matches an imperative/request surface pattern.
pub fn matches_request_pattern(text: &str) -> bool {
    REQUEST_PATTERNS.iter().any(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_addresses_dedups_in_order() {
        let text = "<@U111> and <@U222> please, <@U111> again";
        assert_eq!(extract_addresses(text), vec!["U111", "U222"]);
    }

    #[test]
    fn test_extract_addresses_none() {
        assert!(extract_addresses("no mentions here").is_empty());
    }

    #[test]
    fn test_strip_addresses() {
        let stripped = strip_addresses("<@U111> review the doc <@U222>");
        assert_eq!(stripped, "review the doc");
    }

    #[test]
    fn test_detect_priority_marker_high_first() {
        // High wins when multiple markers appear on one line
        let line = "urgent 🔴 but also 🟢 maybe";
        let (priority, marker) = detect_priority_marker(line).unwrap();
        assert_eq!(priority, Priority::High);
        assert_eq!(marker, "🔴");
    }

    #[test]
    fn test_detect_priority_marker_shortcode() {
        let (priority, marker) = detect_priority_marker("check this :large_yellow_circle:").unwrap();
        assert_eq!(priority, Priority::Medium);
        assert_eq!(marker, ":large_yellow_circle:");
    }

    #[test]
    fn test_detect_priority_marker_absent() {
        assert!(detect_priority_marker("plain text").is_none());
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("fix the build 🔴 today", "🔴"), "fix the build today");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        // Must not panic on a char boundary
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_cancel_and_reminder_markers() {
        assert!(has_cancel_marker("please cancel that"));
        assert!(has_cancel_marker("never mind"));
        assert!(has_cancel_marker("nevermind"));
        assert!(has_cancel_marker("call off the meeting"));
        assert!(!has_cancel_marker("continue as planned"));

        assert!(has_reminder_marker("remind me at 5"));
        assert!(has_reminder_marker("set a reminder"));
        assert!(has_reminder_marker("ping me tomorrow"));
        assert!(!has_reminder_marker("the report is done"));
    }

    #[test]
    fn test_help_patterns() {
        assert!(matches_help_pattern("how do I use this bot?"));
        assert!(matches_help_pattern("what can you do"));
        assert!(matches_help_pattern("help"));
        assert!(!matches_help_pattern("help me move the couch tomorrow"));
    }

    #[test]
    fn test_information_question() {
        assert!(is_information_question("what did we decide last week?"));
        assert!(is_information_question("what is the status of the migration"));
        assert!(!is_information_question("please send the report"));
        // interrogative but not about past/third-party state
        assert!(!is_information_question("ready to go?"));
    }

    #[test]
    fn test_request_patterns() {
        assert!(matches_request_pattern("please send the report by tomorrow 5pm"));
        assert!(matches_request_pattern("can you review this"));
        assert!(!matches_request_pattern("it rained all day"));
    }
}

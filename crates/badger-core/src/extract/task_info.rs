//! Structured task extraction from free text.
//!
//! Turns a message into a normalized draft (title, deadline, priority) via a
//! model call with the current time and timezone in the prompt, so relative
//! expressions like "tomorrow 5pm" resolve deterministically. Extraction
//! never fails past this boundary: a broken model yields a degraded draft
//! built from the raw text.

use std::sync::Arc;

use chrono::{DateTime, LocalResult, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::error::BadgerResult;
use crate::model_output;
use crate::text::truncate_chars;
use crate::traits::{InferenceOptions, ResponseFormat, TextInference};
use crate::types::{format_messages, Message, Outcome, Priority};

/// Title length used by the degraded fallback draft.
const TITLE_FALLBACK_MAX: usize = 100;

/// Normalized work-item draft.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub priority: Priority,
}

/// Parsed reminder command.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest {
    pub title: String,
    pub remind_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawTaskInfo {
    title: String,
    #[serde(default)]
    due_at: Option<String>,
    #[serde(default)]
    priority: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawReminderInfo {
    title: String,
    #[serde(default)]
    remind_at: Option<String>,
}

/// Extracts structured task information from free text.
pub struct TaskExtractor {
    inference: Arc<dyn TextInference>,
    timezone: String,
}

impl TaskExtractor {
    /// Create an extractor resolving relative dates against UTC.
    pub fn new(inference: Arc<dyn TextInference>) -> Self {
        Self {
            inference,
            timezone: "UTC".to_string(),
        }
    }

    /// Set the timezone name given to the model for date resolution.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Extract a task draft from `text`, resolving relative dates against
    /// `now`. Invalid fields in the model response degrade individually
    /// (bad date -> no deadline, bad priority -> medium); a failed call
    /// degrades the whole draft to the raw text.
    pub async fn extract(&self, text: &str, now: DateTime<Utc>) -> Outcome<TaskDraft> {
        match self.extract_with_model(text, now).await {
            Ok(draft) => Outcome::Ok(draft),
            Err(e) => {
                warn!(error = %e, "task extraction failed, using raw text draft");
                let reason = e.to_string();
                Outcome::Degraded {
                    value: TaskDraft {
                        title: truncate_chars(text, TITLE_FALLBACK_MAX),
                        due_at: None,
                        priority: Priority::Medium,
                    },
                    reason,
                }
            }
        }
    }

    /// Parse a reminder command ("remind me about X at 5pm") into a title
    /// and an optional fire time. Same degradation contract as [`extract`].
    ///
    /// [`extract`]: TaskExtractor::extract
    pub async fn parse_reminder_request(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Outcome<ReminderRequest> {
        match self.parse_reminder_with_model(text, now).await {
            Ok(request) => Outcome::Ok(request),
            Err(e) => {
                warn!(error = %e, "reminder parsing failed, using raw text");
                let reason = e.to_string();
                Outcome::Degraded {
                    value: ReminderRequest {
                        title: truncate_chars(text, TITLE_FALLBACK_MAX),
                        remind_at: None,
                    },
                    reason,
                }
            }
        }
    }

    /// Summarize a thread in a few sentences, for the `summary` field of a
    /// work item created from that thread. Failure degrades to an empty
    /// summary and never blocks creation.
    pub async fn summarize_thread(&self, messages: &[Message]) -> Outcome<String> {
        if messages.is_empty() {
            return Outcome::Ok(String::new());
        }
        let prompt = [
            Message::system(
                "Summarize this chat thread in two or three sentences. \
                 Keep decisions, owners, and deadlines; drop pleasantries.",
            ),
            Message::user(format_messages(messages)),
        ];
        let options = InferenceOptions::default()
            .with_temperature(0.2)
            .with_max_tokens(300);

        match self.inference.generate(&prompt, Some(options)).await {
            Ok(response) => {
                let summary = response.content_or_empty().trim().to_string();
                if summary.is_empty() {
                    Outcome::degraded(String::new(), "model returned no summary")
                } else {
                    Outcome::Ok(summary)
                }
            }
            Err(e) => {
                warn!(error = %e, "thread summarization failed");
                Outcome::degraded(String::new(), e.to_string())
            }
        }
    }

    async fn extract_with_model(&self, text: &str, now: DateTime<Utc>) -> BadgerResult<TaskDraft> {
        let messages = [
            Message::system(extraction_prompt(now, &self.timezone)),
            Message::user(format!("Message: {}", text)),
        ];
        let options = InferenceOptions {
            temperature: Some(0.0),
            max_tokens: Some(300),
            top_p: None,
            response_format: Some(ResponseFormat::Json),
        };

        let response = self.inference.generate(&messages, Some(options)).await?;
        let raw: RawTaskInfo = model_output::parse_json(response.content_or_empty())?;

        let title = if raw.title.trim().is_empty() {
            truncate_chars(text, TITLE_FALLBACK_MAX)
        } else {
            raw.title.trim().to_string()
        };

        Ok(TaskDraft {
            title,
            due_at: raw.due_at.as_deref().and_then(parse_due_string),
            priority: coerce_priority(raw.priority.as_ref()),
        })
    }

    async fn parse_reminder_with_model(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> BadgerResult<ReminderRequest> {
        let messages = [
            Message::system(reminder_prompt(now, &self.timezone)),
            Message::user(format!("Message: {}", text)),
        ];
        let options = InferenceOptions {
            temperature: Some(0.0),
            max_tokens: Some(200),
            top_p: None,
            response_format: Some(ResponseFormat::Json),
        };

        let response = self.inference.generate(&messages, Some(options)).await?;
        let raw: RawReminderInfo = model_output::parse_json(response.content_or_empty())?;

        let title = if raw.title.trim().is_empty() {
            truncate_chars(text, TITLE_FALLBACK_MAX)
        } else {
            raw.title.trim().to_string()
        };

        Ok(ReminderRequest {
            title,
            remind_at: raw.remind_at.as_deref().and_then(parse_due_string),
        })
    }
}

/// Parse a deadline string from a model response or operator input.
///
/// Accepts RFC3339, or a bare `YYYY-MM-DD` which resolves to 23:59:59 local
/// time on that day. Anything else is treated as "no deadline".
pub fn parse_due_string(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(end_of_day_due(date));
    }
    warn!(raw = trimmed, "unparseable due date, dropping deadline");
    None
}

/// Resolve a date-only deadline to the end of that day in local time.
pub fn end_of_day_due(date: NaiveDate) -> DateTime<Utc> {
    let naive = match date.and_hms_opt(23, 59, 59) {
        Some(naive) => naive,
        None => date.and_time(chrono::NaiveTime::MIN),
    };
    match chrono::Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

fn coerce_priority(raw: Option<&serde_json::Value>) -> Priority {
    let Some(value) = raw else {
        return Priority::Medium;
    };
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(Priority::from_code),
        serde_json::Value::String(s) => s
            .parse::<Priority>()
            .ok()
            .or_else(|| s.trim().parse::<i64>().ok().and_then(Priority::from_code)),
        _ => None,
    };
    match parsed {
        Some(priority) => priority,
        None => {
            warn!(raw = %value, "invalid priority in extraction, defaulting to medium");
            Priority::Medium
        }
    }
}

/// Generate the task extraction prompt.
fn extraction_prompt(now: DateTime<Utc>, timezone: &str) -> String {
    format!(
        r#"You extract task information from a chat message.

Current time: {} ({})
Resolve relative dates ("tomorrow", "next friday", "in two hours") against the current time and express them in RFC3339 with offset.

Output JSON in this exact format:
{{"title": "<imperative task title without addressee names>", "due_at": "<RFC3339>" or null, "priority": 1 | 2 | 3}}

Rules:
1. Keep the title short, verb first
2. priority 1 = urgent, 2 = normal, 3 = low; default 2
3. due_at is null when no time is stated or implied
4. Return ONLY valid JSON, no other text"#,
        now.to_rfc3339(),
        timezone
    )
}

/// Generate the reminder parsing prompt.
fn reminder_prompt(now: DateTime<Utc>, timezone: &str) -> String {
    format!(
        r#"You parse a reminder request from a chat message.

Current time: {} ({})
Resolve relative times against the current time and express them in RFC3339 with offset.

Output JSON in this exact format:
{{"title": "<what to remind about>", "remind_at": "<RFC3339>" or null}}

Return ONLY valid JSON, no other text."#,
        now.to_rfc3339(),
        timezone
    )
}

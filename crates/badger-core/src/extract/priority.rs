//! Priority resolution with a strict override order.
//!
//! 1. deadline within 24h -> high
//! 2. deadline within 72h -> medium
//! 3. explicit author marker -> used verbatim
//! 4. model judgment; invalid or failed -> medium
//!
//! The ordering is a correctness contract: work due within a day is never
//! down-ranked by a model judgment, and a human's explicit choice is never
//! overwritten by inference.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::error::{BadgerError, BadgerResult};
use crate::traits::{InferenceOptions, TextInference};
use crate::types::{Message, Outcome, Priority};

/// Resolves the priority of a work item.
pub struct PriorityResolver {
    inference: Arc<dyn TextInference>,
}

impl PriorityResolver {
    pub fn new(inference: Arc<dyn TextInference>) -> Self {
        Self { inference }
    }

    /// Determine the priority for `text`, given an optional deadline and an
    /// optional explicit marker chosen by the author.
    pub async fn determine(
        &self,
        text: &str,
        due_at: Option<DateTime<Utc>>,
        explicit_marker: Option<Priority>,
    ) -> Outcome<Priority> {
        self.determine_at(text, due_at, explicit_marker, Utc::now())
            .await
    }

    /// [`determine`] against a caller-supplied clock.
    ///
    /// [`determine`]: PriorityResolver::determine
    pub async fn determine_at(
        &self,
        text: &str,
        due_at: Option<DateTime<Utc>>,
        explicit_marker: Option<Priority>,
        now: DateTime<Utc>,
    ) -> Outcome<Priority> {
        if let Some(due) = due_at {
            let until_due = due - now;
            // Overdue counts as "within 24 hours"
            if until_due <= Duration::hours(24) {
                return Outcome::Ok(Priority::High);
            }
            if until_due <= Duration::hours(72) {
                return Outcome::Ok(Priority::Medium);
            }
        }

        if let Some(marker) = explicit_marker {
            return Outcome::Ok(marker);
        }

        match self.infer_priority(text).await {
            Ok(priority) => Outcome::Ok(priority),
            Err(e) => {
                warn!(error = %e, "priority inference failed, defaulting to medium");
                Outcome::degraded(Priority::Medium, e.to_string())
            }
        }
    }

    async fn infer_priority(&self, text: &str) -> BadgerResult<Priority> {
        let messages = [
            Message::system(
                "Rate the priority of this task. Answer with a single word: \
                 high, medium, or low. No other text.",
            ),
            Message::user(text.to_string()),
        ];
        let options = InferenceOptions::default()
            .with_temperature(0.0)
            .with_max_tokens(10);

        let response = self.inference.generate(&messages, Some(options)).await?;
        let content = response.content_or_empty();

        parse_priority_token(content).ok_or_else(|| {
            BadgerError::inference_response(format!("invalid priority token: {:?}", content))
        })
    }
}

/// Parse a single-token priority judgment. Accepts the label forms and the
/// numeric codes, with surrounding punctuation tolerated.
fn parse_priority_token(response: &str) -> Option<Priority> {
    let token = response
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_lowercase();
    token
        .parse::<Priority>()
        .ok()
        .or_else(|| token.parse::<i64>().ok().and_then(Priority::from_code))
}

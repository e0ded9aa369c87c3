//! Task-or-not judgment for addressed lines.
//!
//! Mention analysis asks, per line, whether the addressed user is actually
//! being handed work (as opposed to being greeted, thanked, or cc'd). The
//! judge is optional at the call site; when disabled, every addressed line
//! counts as a task.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::error::BadgerResult;
use crate::model_output;
use crate::traits::{InferenceOptions, TextInference};
use crate::types::{Message, Outcome};

/// Minimum confidence for a positive judgment to count as actionable.
pub const TASK_CONFIDENCE_GATE: u8 = 70;

/// Judgment for one line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskJudgment {
    pub is_task: bool,
    /// 0-100.
    pub confidence: u8,
    pub reason: String,
}

impl TaskJudgment {
    /// Whether the line should be recorded as a mention.
    pub fn is_actionable(&self) -> bool {
        self.is_task && self.confidence >= TASK_CONFIDENCE_GATE
    }
}

#[derive(Debug, Deserialize)]
struct RawTaskJudgment {
    is_task: bool,
    confidence: u8,
    #[serde(default)]
    reason: Option<String>,
}

/// Judges whether an addressed line hands the addressee work.
pub struct TaskJudge {
    inference: Arc<dyn TextInference>,
}

impl TaskJudge {
    pub fn new(inference: Arc<dyn TextInference>) -> Self {
        Self { inference }
    }

    /// Judge `text`. Failures degrade to "not a task" with zero confidence,
    /// so a broken model never floods the tracker with false mentions.
    pub async fn judge(&self, text: &str) -> Outcome<TaskJudgment> {
        match self.judge_with_model(text).await {
            Ok(judgment) => Outcome::Ok(judgment),
            Err(e) => {
                warn!(error = %e, "task judgment failed, treating line as non-task");
                let reason = e.to_string();
                Outcome::Degraded {
                    value: TaskJudgment {
                        is_task: false,
                        confidence: 0,
                        reason: reason.clone(),
                    },
                    reason,
                }
            }
        }
    }

    async fn judge_with_model(&self, text: &str) -> BadgerResult<TaskJudgment> {
        let messages = [
            Message::system(task_judgment_prompt()),
            Message::user(format!("Line: {}", text)),
        ];
        let options = InferenceOptions::json()
            .with_temperature(0.0)
            .with_max_tokens(150);

        let response = self.inference.generate(&messages, Some(options)).await?;
        let raw: RawTaskJudgment = model_output::parse_json(response.content_or_empty())?;

        Ok(TaskJudgment {
            is_task: raw.is_task,
            confidence: raw.confidence.min(100),
            reason: raw.reason.unwrap_or_else(|| "model judgment".to_string()),
        })
    }
}

/// Generate the task judgment prompt.
fn task_judgment_prompt() -> String {
    r#"You decide whether a chat line addressed to a coworker hands them work to do.

A line is a task when it asks the addressee to produce, fix, review, decide, or deliver something. Greetings, thanks, FYIs, and social chatter are not tasks.

Output JSON in this exact format:
{"is_task": true|false, "confidence": <0-100>, "reason": "<short justification>"}

Return ONLY valid JSON, no other text."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BadgerError;
    use crate::traits::InferenceResponse;
    use async_trait::async_trait;

    struct MockInference {
        response: Option<String>,
    }

    #[async_trait]
    impl TextInference for MockInference {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: Option<InferenceOptions>,
        ) -> BadgerResult<InferenceResponse> {
            match &self.response {
                Some(content) => Ok(InferenceResponse {
                    content: Some(content.clone()),
                    usage: None,
                }),
                None => Err(BadgerError::inference("mock failure")),
            }
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn judge(response: Option<&str>) -> TaskJudge {
        TaskJudge::new(Arc::new(MockInference {
            response: response.map(|s| s.to_string()),
        }))
    }

    #[tokio::test]
    async fn test_positive_judgment() {
        let j = judge(Some(
            r#"{"is_task": true, "confidence": 90, "reason": "asks for a review"}"#,
        ));
        let outcome = j.judge("review the design doc").await;
        assert!(!outcome.is_degraded());
        assert!(outcome.value().is_task);
        assert!(outcome.value().is_actionable());
    }

    #[tokio::test]
    async fn test_negative_judgment() {
        let j = judge(Some(r#"{"is_task": false, "confidence": 95}"#));
        let outcome = j.judge("thanks for yesterday!").await;
        assert!(!outcome.value().is_task);
        assert!(!outcome.value().is_actionable());
    }

    #[tokio::test]
    async fn test_low_confidence_positive_is_not_actionable() {
        let j = judge(Some(r#"{"is_task": true, "confidence": 40, "reason": "maybe"}"#));
        let outcome = j.judge("the thing we talked about").await;
        assert!(outcome.value().is_task);
        assert!(!outcome.value().is_actionable());
    }

    #[tokio::test]
    async fn test_failure_degrades_to_non_task() {
        let j = judge(None);
        let outcome = j.judge("review the design doc").await;
        assert!(outcome.is_degraded());
        assert!(!outcome.value().is_task);
        assert_eq!(outcome.value().confidence, 0);
    }

    #[tokio::test]
    async fn test_malformed_response_degrades() {
        let j = judge(Some("sure, that looks like a task to me"));
        let outcome = j.judge("review the design doc").await;
        assert!(outcome.is_degraded());
        assert!(!outcome.value().is_task);
    }
}

//! Intent classification for inbound messages.
//!
//! A fast rule-based path handles the unambiguous phrasings; everything else
//! falls through to a model call with the same taxonomy. The rules are
//! ordered, first match wins:
//! 1. cancel marker + reminder marker -> reminder_cancel
//! 2. reminder marker alone -> reminder_setup
//! 3. help surface pattern -> help
//! 4. interrogative about past/third-party state -> information
//! 5. imperative/request surface pattern -> task_request
//! 6. model fallback; on failure, fail soft to help with confidence 50

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::{BadgerError, BadgerResult};
use crate::model_output;
use crate::text;
use crate::traits::{InferenceOptions, TextInference};
use crate::types::{Message, Outcome};

/// Default confidence gate for downstream effects.
pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 70;

/// Confidence assigned when the model fallback itself fails.
const FALLBACK_CONFIDENCE: u8 = 50;

/// What the author wants from the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    /// Asking someone to do concrete work.
    TaskRequest,
    /// Asking about past events or someone else's state.
    Information,
    /// Asking to be notified at or before a time.
    ReminderSetup,
    /// Asking for an existing reminder to be removed.
    ReminderCancel,
    /// Asking what the assistant can do, or nothing else fits.
    Help,
}

/// Classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentResult {
    pub intent: Intent,
    /// 0-100.
    pub confidence: u8,
    /// Which rule fired, or the model's justification.
    pub reason: String,
}

/// Model judgment shape, validated at the boundary.
#[derive(Debug, Deserialize)]
struct RawIntentJudgment {
    intent: Intent,
    confidence: u8,
    #[serde(default)]
    reason: Option<String>,
}

/// Routes inbound messages to an intent.
pub struct IntentClassifier {
    inference: Arc<dyn TextInference>,
    confidence_threshold: u8,
}

impl IntentClassifier {
    /// Create a classifier with the default confidence threshold.
    pub fn new(inference: Arc<dyn TextInference>) -> Self {
        Self {
            inference,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Override the confidence threshold used by [`is_confident`].
    ///
    /// [`is_confident`]: IntentClassifier::is_confident
    pub fn with_confidence_threshold(mut self, threshold: u8) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Classify `text`, optionally with surrounding thread context for the
    /// model fallback. Rule matches never consult the model.
    pub async fn classify(&self, text: &str, thread_context: Option<&str>) -> Outcome<IntentResult> {
        // Cancel must be checked before setup: "cancel the reminder" contains
        // a reminder marker too.
        if text::has_cancel_marker(text) && text::has_reminder_marker(text) {
            return Outcome::Ok(IntentResult {
                intent: Intent::ReminderCancel,
                confidence: 100,
                reason: "cancel and reminder markers".to_string(),
            });
        }
        if text::has_reminder_marker(text) {
            return Outcome::Ok(IntentResult {
                intent: Intent::ReminderSetup,
                confidence: 100,
                reason: "reminder marker".to_string(),
            });
        }
        if text::matches_help_pattern(text) {
            return Outcome::Ok(IntentResult {
                intent: Intent::Help,
                confidence: 95,
                reason: "help surface pattern".to_string(),
            });
        }
        if text::is_information_question(text) {
            return Outcome::Ok(IntentResult {
                intent: Intent::Information,
                confidence: 85,
                reason: "question about past or third-party state".to_string(),
            });
        }
        if text::matches_request_pattern(text) {
            return Outcome::Ok(IntentResult {
                intent: Intent::TaskRequest,
                confidence: 80,
                reason: "request surface pattern".to_string(),
            });
        }

        debug!("no rule matched, delegating intent to model");
        match self.classify_with_model(text, thread_context).await {
            Ok(result) => Outcome::Ok(result),
            Err(e) => {
                warn!(error = %e, "intent inference failed, falling back to help");
                let reason = e.to_string();
                Outcome::Degraded {
                    value: IntentResult {
                        intent: Intent::Help,
                        confidence: FALLBACK_CONFIDENCE,
                        reason: reason.clone(),
                    },
                    reason,
                }
            }
        }
    }

    /// Whether `result` is confident enough to act on without confirmation.
    pub fn is_confident(&self, result: &IntentResult) -> bool {
        result.confidence >= self.confidence_threshold
    }

    async fn classify_with_model(
        &self,
        text: &str,
        thread_context: Option<&str>,
    ) -> BadgerResult<IntentResult> {
        let mut user = format!("Message: {}", text);
        if let Some(context) = thread_context {
            user.push_str(&format!("\n\nThread context:\n{}", context));
        }
        let messages = [Message::system(intent_prompt()), Message::user(user)];
        let options = InferenceOptions::json()
            .with_temperature(0.0)
            .with_max_tokens(200);

        let response = self.inference.generate(&messages, Some(options)).await?;
        let judgment: RawIntentJudgment = model_output::parse_json(response.content_or_empty())?;

        if judgment.confidence > 100 {
            return Err(BadgerError::inference_response(format!(
                "confidence {} out of range",
                judgment.confidence
            )));
        }

        Ok(IntentResult {
            intent: judgment.intent,
            confidence: judgment.confidence,
            reason: judgment
                .reason
                .unwrap_or_else(|| "model judgment".to_string()),
        })
    }
}

/// Generate the intent classification prompt.
fn intent_prompt() -> String {
    r#"You are an intent router for a task-tracking chat assistant. Classify the user message into exactly one intent.

INTENTS:
- task_request: the author asks someone to do concrete work
- information: the author asks about past events or someone else's state
- reminder_setup: the author wants to be notified at or before a time
- reminder_cancel: the author wants an existing reminder removed
- help: the author asks what the assistant can do, or nothing else fits

Examples:
"draft the agenda before the offsite" -> {"intent": "task_request", "confidence": 85, "reason": "concrete work with a deadline"}
"who owns the billing migration?" -> {"intent": "information", "confidence": 90, "reason": "question about current ownership"}
"I keep forgetting the standup" -> {"intent": "reminder_setup", "confidence": 75, "reason": "implicit wish to be notified"}

Output JSON in this exact format:
{"intent": "<one of the five>", "confidence": <0-100>, "reason": "<short justification>"}

Return ONLY valid JSON, no other text."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BadgerError;
    use crate::traits::InferenceResponse;
    use async_trait::async_trait;

    /// Mock inference returning a canned response, or failing when none is set.
    struct MockInference {
        response: Option<String>,
    }

    impl MockInference {
        fn replying(response: &str) -> Self {
            Self {
                response: Some(response.to_string()),
            }
        }

        fn failing() -> Self {
            Self { response: None }
        }
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

    fn classifier(mock: MockInference) -> IntentClassifier {
        IntentClassifier::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_cancel_plus_reminder_is_cancel() {
        let c = classifier(MockInference::failing());
        // Model is never consulted; the failing mock proves it.
        let result = c
            .classify("please cancel the reminder about the demo", None)
            .await;
        assert!(!result.is_degraded());
        assert_eq!(result.value().intent, Intent::ReminderCancel);
        assert_eq!(result.value().confidence, 100);
    }

    #[tokio::test]
    async fn test_cancel_rule_ignores_other_content() {
        let c = classifier(MockInference::failing());
        let result = c
            .classify("what is the status? also stop the alert for friday", None)
            .await;
        assert_eq!(result.value().intent, Intent::ReminderCancel);
        assert_eq!(result.value().confidence, 100);
    }

    #[tokio::test]
    async fn test_reminder_alone_is_setup() {
        let c = classifier(MockInference::failing());
        let result = c.classify("remind me to file the report at 5pm", None).await;
        assert_eq!(result.value().intent, Intent::ReminderSetup);
        assert_eq!(result.value().confidence, 100);
    }

    #[tokio::test]
    async fn test_help_pattern() {
        let c = classifier(MockInference::failing());
        let result = c.classify("what can you do?", None).await;
        assert_eq!(result.value().intent, Intent::Help);
        assert_eq!(result.value().confidence, 95);
    }

    #[tokio::test]
    async fn test_information_question() {
        let c = classifier(MockInference::failing());
        let result = c.classify("what did we decide last week?", None).await;
        assert_eq!(result.value().intent, Intent::Information);
        assert_eq!(result.value().confidence, 85);
    }

    #[tokio::test]
    async fn test_request_pattern_is_task() {
        let c = classifier(MockInference::failing());
        let result = c
            .classify("please send the report by tomorrow 5pm", None)
            .await;
        assert!(!result.is_degraded());
        assert_eq!(result.value().intent, Intent::TaskRequest);
        assert_eq!(result.value().confidence, 80);
    }

    #[tokio::test]
    async fn test_model_fallback_success() {
        let c = classifier(MockInference::replying(
            r#"{"intent": "information", "confidence": 88, "reason": "asks about ownership"}"#,
        ));
        let result = c.classify("hmm, the billing thing", None).await;
        assert!(!result.is_degraded());
        assert_eq!(result.value().intent, Intent::Information);
        assert_eq!(result.value().confidence, 88);
    }

    #[tokio::test]
    async fn test_model_fallback_fenced_json() {
        let c = classifier(MockInference::replying(
            "```json\n{\"intent\": \"task_request\", \"confidence\": 72, \"reason\": \"work\"}\n```",
        ));
        let result = c.classify("the usual thing for thursday", None).await;
        assert_eq!(result.value().intent, Intent::TaskRequest);
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_help() {
        let c = classifier(MockInference::failing());
        let result = c.classify("mysterious unclassifiable mumbling", None).await;
        assert!(result.is_degraded());
        assert_eq!(result.value().intent, Intent::Help);
        assert_eq!(result.value().confidence, 50);
        assert!(result.value().reason.contains("mock failure"));
    }

    #[tokio::test]
    async fn test_unknown_intent_string_degrades() {
        let c = classifier(MockInference::replying(
            r#"{"intent": "banter", "confidence": 90}"#,
        ));
        let result = c.classify("mysterious unclassifiable mumbling", None).await;
        assert!(result.is_degraded());
        assert_eq!(result.value().intent, Intent::Help);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_degrades() {
        let c = classifier(MockInference::replying(
            r#"{"intent": "help", "confidence": 150}"#,
        ));
        let result = c.classify("mysterious unclassifiable mumbling", None).await;
        assert!(result.is_degraded());
        assert_eq!(result.value().confidence, 50);
    }

    #[tokio::test]
    async fn test_is_confident_threshold() {
        let c = classifier(MockInference::failing());
        let confident = IntentResult {
            intent: Intent::TaskRequest,
            confidence: 70,
            reason: String::new(),
        };
        let hesitant = IntentResult {
            confidence: 69,
            ..confident.clone()
        };
        assert!(c.is_confident(&confident));
        assert!(!c.is_confident(&hesitant));

        let strict = classifier(MockInference::failing()).with_confidence_threshold(90);
        assert!(!strict.is_confident(&confident));
    }
}

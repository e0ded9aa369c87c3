//! Slack notifier implementation.
//!
//! Posts messages through the Slack Web API. Thread anchors map onto
//! `thread_ts`, so reminder follow-ups land in the conversation they came
//! from.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use badger_core::error::{BadgerError, BadgerResult};
use badger_core::traits::{Notifier, NotifierConfig};

const SLACK_API_URL: &str = "https://slack.com/api";

/// Notifier backed by the Slack `chat.postMessage` endpoint.
pub struct SlackNotifier {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest {
    channel: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl SlackNotifier {
    /// Create a new Slack notifier.
    pub fn new(config: NotifierConfig) -> BadgerResult<Self> {
        let token = config
            .token
            .clone()
            .or_else(|| std::env::var("SLACK_BOT_TOKEN").ok())
            .ok_or_else(|| {
                BadgerError::Configuration("Slack bot token not found. Set SLACK_BOT_TOKEN environment variable or provide token in config.".to_string())
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token)
                .parse()
                .map_err(|_| BadgerError::Configuration("Invalid token format".to_string()))?,
        );
        headers.insert(
            "content-type",
            "application/json; charset=utf-8"
                .parse()
                .map_err(|_| BadgerError::Configuration("Invalid content type".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                BadgerError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| SLACK_API_URL.to_string());

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post(
        &self,
        conversation_id: &str,
        text: &str,
        thread_anchor_id: Option<&str>,
    ) -> BadgerResult<()> {
        let request = PostMessageRequest {
            channel: conversation_id.to_string(),
            text: text.to_string(),
            thread_ts: thread_anchor_id.map(String::from),
        };

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| BadgerError::notification(format!("Slack API request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BadgerError::notification(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(BadgerError::notification(format!(
                "Slack API error ({}): {}",
                status, body
            )));
        }

        let parsed: PostMessageResponse = serde_json::from_str(&body)
            .map_err(|e| BadgerError::notification(format!("Failed to parse response: {}", e)))?;

        if !parsed.ok {
            return Err(BadgerError::notification(format!(
                "Slack API error: {}",
                parsed.error.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        debug!(
            conversation = conversation_id,
            ts = parsed.ts.as_deref().unwrap_or(""),
            "message posted"
        );
        Ok(())
    }
}

//! Webhook notifier with retry and signature.
//!
//! Delivers outbound messages to an external HTTP endpoint with:
//! - HMAC-SHA256 payload signing for verification
//! - Exponential backoff retry on transient failures

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::warn;

use badger_core::error::{BadgerError, BadgerResult};
use badger_core::traits::{Notifier, NotifierConfig};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error type for webhook delivery
#[derive(Debug, Clone)]
pub enum WebhookError {
    /// Transient error (5xx, network) - should retry
    Transient(String),
    /// Permanent error (4xx) - should not retry
    Permanent(String),
    /// Configuration error
    Config(String),
}

impl std::fmt::Display for WebhookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(msg) => write!(f, "Transient error: {}", msg),
            Self::Permanent(msg) => write!(f, "Permanent error: {}", msg),
            Self::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for WebhookError {}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 10_000,
            multiplier: 2.0_f32,
        }
    }
}

/// Body delivered to the webhook endpoint, one per posted message.
#[derive(Debug, Serialize, Deserialize)]
pub struct OutboundPayload {
    pub conversation_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_anchor_id: Option<String>,
    pub posted_at: DateTime<Utc>,
}

/// Notifier that delivers messages to a configured HTTP endpoint.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
    retry_policy: RetryPolicy,
}

impl WebhookNotifier {
    /// Create a new webhook notifier.
    pub fn new(config: NotifierConfig) -> BadgerResult<Self> {
        let url = config
            .webhook_url
            .clone()
            .or_else(|| std::env::var("BADGER_WEBHOOK_URL").ok())
            .ok_or_else(|| {
                BadgerError::Configuration("Webhook URL not found. Set BADGER_WEBHOOK_URL environment variable or provide webhook_url in config.".to_string())
            })?;

        let secret = config
            .signing_secret
            .clone()
            .or_else(|| std::env::var("BADGER_WEBHOOK_SECRET").ok());

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                BadgerError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url,
            secret,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Builder: set retry policy
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    async fn deliver(&self, payload: &str, signature: &str) -> Result<(), WebhookError> {
        let deliver_once = || async {
            let response = self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json")
                .header("X-Badger-Signature", signature)
                .header("X-Badger-Delivery", uuid::Uuid::new_v4().to_string())
                .body(payload.to_string())
                .send()
                .await
                .map_err(|e| WebhookError::Transient(format!("Network error: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else if status.is_server_error() {
                // 5xx: transient, should retry
                Err(WebhookError::Transient(format!("Server error: {}", status)))
            } else {
                // 4xx: permanent, don't retry
                let body = response.text().await.unwrap_or_default();
                Err(WebhookError::Permanent(format!(
                    "Client error {}: {}",
                    status, body
                )))
            }
        };

        let policy = &self.retry_policy;
        deliver_once
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(policy.max_retries as usize)
                    .with_min_delay(Duration::from_millis(policy.initial_delay_ms))
                    .with_max_delay(Duration::from_millis(policy.max_delay_ms))
                    .with_factor(policy.multiplier),
            )
            .when(|e| matches!(e, WebhookError::Transient(_)))
            .notify(|err, dur| {
                warn!(url = %self.url, delay = ?dur, error = %err, "webhook delivery failed, retrying");
            })
            .await
    }

    /// Sign payload with HMAC-SHA256
    fn sign_payload(&self, payload: &str) -> String {
        match &self.secret {
            Some(secret) => {
                let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
                    .expect("HMAC accepts any key length");
                mac.update(payload.as_bytes());
                let result = mac.finalize();
                format!("sha256={}", hex::encode(result.into_bytes()))
            }
            None => String::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn post(
        &self,
        conversation_id: &str,
        text: &str,
        thread_anchor_id: Option<&str>,
    ) -> BadgerResult<()> {
        let payload = OutboundPayload {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            thread_anchor_id: thread_anchor_id.map(String::from),
            posted_at: Utc::now(),
        };

        let body = serde_json::to_string(&payload)
            .map_err(|e| BadgerError::notification(format!("Serialization error: {}", e)))?;
        let signature = self.sign_payload(&body);

        self.deliver(&body, &signature)
            .await
            .map_err(|e| BadgerError::notification(format!("Webhook delivery failed: {}", e)))
    }
}

/// Verify a webhook signature
///
/// Used by webhook receivers to verify the payload came from this notifier
pub fn verify_signature(payload: &str, secret: &str, signature: &str) -> bool {
    let expected = {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        let result = mac.finalize();
        format!("sha256={}", hex::encode(result.into_bytes()))
    };

    // Constant-time comparison to prevent timing attacks
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

/// Constant-time equality comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

//! Configuration system for the assistant.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classify::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::reminders::{ReminderScheduleConfig, DEFAULT_COOLDOWN_MINUTES};
use crate::traits::{InferenceConfig, NotifierConfig};

/// Inference provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InferenceProvider {
    #[default]
    OpenAI,
    Anthropic,
}

/// Notifier provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierProvider {
    #[default]
    Slack,
    Webhook,
}

/// Inference provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceProviderConfig {
    /// Provider type.
    pub provider: InferenceProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: InferenceConfig,
}

impl Default for InferenceProviderConfig {
    fn default() -> Self {
        Self {
            provider: InferenceProvider::OpenAI,
            config: InferenceConfig::default(),
        }
    }
}

/// Notifier provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierProviderConfig {
    /// Provider type.
    pub provider: NotifierProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: NotifierConfig,
}

impl Default for NotifierProviderConfig {
    fn default() -> Self {
        Self {
            provider: NotifierProvider::Slack,
            config: NotifierConfig::default(),
        }
    }
}

/// Main assistant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Inference provider configuration.
    pub inference: InferenceProviderConfig,
    /// Notifier provider configuration.
    pub notifier: NotifierProviderConfig,
    /// Path to the work item and mention database. `None` keeps both
    /// stores in memory, for development and tests.
    pub db_path: Option<PathBuf>,
    /// Platform user id of the assistant itself.
    pub bot_user_id: String,
    /// Confidence required to act on a task intent without confirmation.
    pub confidence_threshold: u8,
    /// Notification cooldown per item, in minutes.
    pub cooldown_minutes: i64,
    /// Whether mention lines are filtered through a task judgment.
    pub enable_line_classification: bool,
    /// Timezone name used when interpreting stated deadlines.
    pub timezone: String,
    /// Cron schedules for the periodic sweeps.
    pub schedule: ReminderScheduleConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            inference: InferenceProviderConfig::default(),
            notifier: NotifierProviderConfig::default(),
            db_path: Some(Self::default_db_path()),
            bot_user_id: String::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            enable_line_classification: true,
            timezone: "UTC".to_string(),
            schedule: ReminderScheduleConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Conventional database location, `~/.badger/badger.db`.
    pub fn default_db_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".badger"))
            .unwrap_or_else(|| PathBuf::from(".badger"))
            .join("badger.db")
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::BadgerResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| crate::error::BadgerError::Configuration(e.to_string())),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| crate::error::BadgerError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| crate::error::BadgerError::Configuration(e.to_string())),
            _ => Err(crate::error::BadgerError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables, on top of the
    /// defaults. A `.env` file in the working directory is honored.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(bot_user_id) = std::env::var("BADGER_BOT_USER_ID") {
            config.bot_user_id = bot_user_id;
        }
        if let Ok(path) = std::env::var("BADGER_DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Ok(timezone) = std::env::var("BADGER_TIMEZONE") {
            config.timezone = timezone;
        }
        if let Ok(threshold) = std::env::var("BADGER_CONFIDENCE_THRESHOLD") {
            if let Ok(threshold) = threshold.parse() {
                config.confidence_threshold = threshold;
            }
        }
        if let Ok(cooldown) = std::env::var("BADGER_COOLDOWN_MINUTES") {
            if let Ok(cooldown) = cooldown.parse() {
                config.cooldown_minutes = cooldown;
            }
        }

        // Inference configuration
        if let Ok(provider) = std::env::var("BADGER_INFERENCE_PROVIDER") {
            config.inference.provider = match provider.to_lowercase().as_str() {
                "anthropic" => InferenceProvider::Anthropic,
                _ => InferenceProvider::OpenAI,
            };
        }
        if let Ok(model) = std::env::var("BADGER_MODEL") {
            config.inference.config.model = model;
        }
        let key_var = match config.inference.provider {
            InferenceProvider::OpenAI => "OPENAI_API_KEY",
            InferenceProvider::Anthropic => "ANTHROPIC_API_KEY",
        };
        if let Ok(api_key) = std::env::var(key_var) {
            config.inference.config.api_key = Some(api_key);
        }

        // Notifier configuration
        if let Ok(provider) = std::env::var("BADGER_NOTIFIER_PROVIDER") {
            config.notifier.provider = match provider.to_lowercase().as_str() {
                "webhook" => NotifierProvider::Webhook,
                _ => NotifierProvider::Slack,
            };
        }
        if let Ok(token) = std::env::var("SLACK_BOT_TOKEN") {
            config.notifier.config.token = Some(token);
        }
        if let Ok(url) = std::env::var("BADGER_WEBHOOK_URL") {
            config.notifier.config.webhook_url = Some(url);
        }
        if let Ok(secret) = std::env::var("BADGER_WEBHOOK_SECRET") {
            config.notifier.config.signing_secret = Some(secret);
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder::default()
    }
}

/// Builder for AssistantConfig.
#[derive(Default)]
pub struct AssistantConfigBuilder {
    config: AssistantConfig,
}

impl AssistantConfigBuilder {
    /// Set the assistant's platform user id.
    pub fn bot_user_id(mut self, bot_user_id: impl Into<String>) -> Self {
        self.config.bot_user_id = bot_user_id.into();
        self
    }

    /// Set the database path.
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.config.db_path = Some(path);
        self
    }

    /// Keep the stores in memory instead of on disk.
    pub fn in_memory(mut self) -> Self {
        self.config.db_path = None;
        self
    }

    /// Set inference configuration.
    pub fn inference(mut self, config: InferenceProviderConfig) -> Self {
        self.config.inference = config;
        self
    }

    /// Set notifier configuration.
    pub fn notifier(mut self, config: NotifierProviderConfig) -> Self {
        self.config.notifier = config;
        self
    }

    /// Set the confidence threshold.
    pub fn confidence_threshold(mut self, threshold: u8) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    /// Set the notification cooldown.
    pub fn cooldown_minutes(mut self, minutes: i64) -> Self {
        self.config.cooldown_minutes = minutes;
        self
    }

    /// Enable or disable mention line classification.
    pub fn enable_line_classification(mut self, enabled: bool) -> Self {
        self.config.enable_line_classification = enabled;
        self
    }

    /// Set the timezone.
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.config.timezone = timezone.into();
        self
    }

    /// Set the sweep schedules.
    pub fn schedule(mut self, schedule: ReminderScheduleConfig) -> Self {
        self.config.schedule = schedule;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AssistantConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AssistantConfig::default();
        assert_eq!(config.confidence_threshold, 70);
        assert_eq!(config.cooldown_minutes, 60);
        assert!(config.enable_line_classification);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.inference.provider, InferenceProvider::OpenAI);
        assert_eq!(config.notifier.provider, NotifierProvider::Slack);
        assert!(config.db_path.is_some());
    }

    #[test]
    fn test_in_memory_builder() {
        let config = AssistantConfig::builder().in_memory().build();
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_builder() {
        let config = AssistantConfig::builder()
            .bot_user_id("UBOT")
            .confidence_threshold(80)
            .timezone("Asia/Seoul")
            .build();
        assert_eq!(config.bot_user_id, "UBOT");
        assert_eq!(config.confidence_threshold, 80);
        assert_eq!(config.timezone, "Asia/Seoul");
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
bot_user_id = "UBOT"
cooldown_minutes = 30

[inference]
provider = "anthropic"
model = "claude-3-5-haiku-latest"

[schedule]
escalation_age_hours = 48
"#
        )
        .unwrap();

        let config = AssistantConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bot_user_id, "UBOT");
        assert_eq!(config.cooldown_minutes, 30);
        assert_eq!(config.inference.provider, InferenceProvider::Anthropic);
        assert_eq!(config.inference.config.model, "claude-3-5-haiku-latest");
        assert_eq!(config.schedule.escalation_age_hours, 48);
        // Untouched sections keep their defaults
        assert_eq!(config.confidence_threshold, 70);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(AssistantConfig::from_file(file.path()).is_err());
    }
}

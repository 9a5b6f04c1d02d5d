//! Delivery and notifier configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, policy::RetryPolicy};

/// Environment variable consulted when `api_key` is not set in the config file.
pub const API_KEY_ENV: &str = "SCOREPOST_API_KEY";

/// Configuration for one active delivery queue.
///
/// Example (RON):
///
/// ```ron
/// (
///     endpoint: "https://scoring.example.com/api",
///     pacing_interval_ms: 5000,
///     max_attempts: 3,
///     escalation_recipients: "ops@example.com, oncall@example.com",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Base URL of the scoring API; items are posted to `{endpoint}/score`.
    pub endpoint: String,

    /// Delay before draining a fresh batch and before each retry.
    ///
    /// Default: 5000 ms
    #[serde(default = "defaults::pacing_interval_ms")]
    pub pacing_interval_ms: u64,

    /// Number of failed retries tolerated before an envelope is escalated.
    ///
    /// Default: 3
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Comma separated e-mail addresses, validated when an escalation is sent.
    #[serde(default)]
    pub escalation_recipients: String,

    #[serde(default = "defaults::escalation_subject")]
    pub escalation_subject: String,

    /// Default: 30 seconds
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Sent as `X-Api-Key`; must be a UUID. Falls back to `SCOREPOST_API_KEY`
    /// when unset, and requests go out unauthenticated if neither is present.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl DeliveryConfig {
    /// Configuration for `endpoint` with every other field at its default.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            pacing_interval_ms: defaults::pacing_interval_ms(),
            max_attempts: defaults::max_attempts(),
            escalation_recipients: String::new(),
            escalation_subject: defaults::escalation_subject(),
            request_timeout_secs: defaults::request_timeout_secs(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_escalation_recipients(mut self, recipients: impl Into<String>) -> Self {
        self.escalation_recipients = recipients.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub const fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.pacing_interval())
    }

    /// The API key from the config, or from `SCOREPOST_API_KEY`. Empty keys
    /// count as absent.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `max_attempts` is zero, `endpoint` is not
    /// an absolute HTTP(S) URL, or the resolved API key is not a UUID.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(self.max_attempts));
        }

        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }

        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if let Some(key) = self.resolved_api_key() {
            uuid::Uuid::parse_str(key.trim())
                .map_err(|e| ConfigError::InvalidApiKey(e.to_string()))?;
        }

        Ok(())
    }
}

/// How escalation mail reaches the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpNotifierConfig {
    /// `host:port` of the SMTP relay.
    #[serde(default = "defaults::relay")]
    pub relay: String,

    #[serde(default = "defaults::helo")]
    pub helo: String,

    /// Envelope sender and `From` header.
    #[serde(default = "defaults::from")]
    pub from: String,

    /// Limit for a whole SMTP transaction.
    #[serde(default = "defaults::notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SmtpNotifierConfig {
    fn default() -> Self {
        Self {
            relay: defaults::relay(),
            helo: defaults::helo(),
            from: defaults::from(),
            timeout_secs: defaults::notify_timeout_secs(),
        }
    }
}

impl SmtpNotifierConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

mod defaults {
    pub const fn pacing_interval_ms() -> u64 {
        5000
    }

    pub const fn max_attempts() -> u32 {
        3
    }

    pub fn escalation_subject() -> String {
        "Content Scoring Error".to_string()
    }

    pub const fn request_timeout_secs() -> u64 {
        30
    }

    pub fn relay() -> String {
        "localhost:25".to_string()
    }

    pub fn helo() -> String {
        "localhost".to_string()
    }

    pub fn from() -> String {
        "scorepost@localhost".to_string()
    }

    pub const fn notify_timeout_secs() -> u64 {
        30
    }
}

//! Typed errors for the delivery queue.
//!
//! Per-item delivery failures are not errors at this level: a `4xx`/`5xx`
//! answer from the scoring API is a [`DeliveryOutcome`](crate::DeliveryOutcome)
//! and is retried by the queue. The types here cover the things that stop a
//! call from producing an outcome at all, plus configuration and escalation.

use std::time::Duration;

use scorepost_common::address::AddressError;
use scorepost_smtp::ClientError;
use thiserror::Error;

/// Top-level error for constructing and reconfiguring the delivery service.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("Score {0} is outside the range 0..=8")]
    OutOfRange(u8),
}

/// Configuration rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1, got {0}")]
    InvalidMaxAttempts(u32),

    #[error("endpoint must not be empty")]
    EmptyEndpoint,

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The key itself is left out of the message.
    #[error("api_key is not a UUID: {0}")]
    InvalidApiKey(String),
}

/// A delivery call that could not produce an HTTP outcome.
///
/// When this happens mid-batch, the current item and every item after it in
/// the batch are failed with this error's text.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport future panicked; the payload is rendered if it was a string.
    #[error("Transport panicked: {0}")]
    Panicked(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Whether the request timed out rather than failing outright.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Failure to hand a notification to the mail relay.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] ClientError),

    #[error("Recipient {recipient} rejected: {code} {message}")]
    RecipientRejected {
        recipient: String,
        code: u16,
        message: String,
    },

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

impl NotifyError {
    /// Whether trying the same notification again later might succeed.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        match self {
            Self::Smtp(e) => e.is_temporary(),
            Self::RecipientRejected { code, .. } => *code >= 400 && *code < 500,
            Self::Timeout(_) => true,
        }
    }
}

/// Escalation could not be delivered. Logged by the worker, never retried.
#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("No escalation recipients configured")]
    NoRecipients,

    #[error("Invalid escalation recipient: {0}")]
    InvalidRecipient(#[from] AddressError),

    #[error("Failed to send escalation: {0}")]
    Notify(#[from] NotifyError),
}

impl EscalationError {
    /// Configuration problems, as opposed to the relay failing.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::NoRecipients | Self::InvalidRecipient(_))
    }

    /// Whether the relay failure looked transient.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        match self {
            Self::Notify(e) => e.is_temporary(),
            Self::NoRecipients | Self::InvalidRecipient(_) => false,
        }
    }
}

//! The two network seams of the queue: delivering a work item and sending an
//! escalation notice. Both are traits so the queue can be driven by fakes.

mod http;
mod smtp;

use async_trait::async_trait;
use scorepost_common::address::Address;

pub use http::HttpTransport;
pub use smtp::SmtpNotifier;

use crate::{
    error::{NotifyError, TransportError},
    types::WorkItem,
};

/// Classified answer of the scoring API for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// `2xx`
    Delivered,
    /// `4xx` with the server's message.
    ClientError(String),
    /// `5xx` (or any other unexpected status) with the server's message.
    ServerError(String),
}

impl DeliveryOutcome {
    /// The failure message, or `None` for [`DeliveryOutcome::Delivered`].
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Delivered => None,
            Self::ClientError(message) | Self::ServerError(message) => Some(message),
        }
    }
}

/// Delivers a single work item.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response could be obtained.
    async fn send(&self, item: &WorkItem) -> Result<DeliveryOutcome, TransportError>;
}

/// Sends an HTML notification to a group of people.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`NotifyError`] if the message was not accepted for every
    /// recipient.
    async fn notify(
        &self,
        recipients: &[Address],
        subject: &str,
        body_html: &str,
    ) -> Result<(), NotifyError>;
}

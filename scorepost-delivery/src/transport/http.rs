use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{DeliveryOutcome, DeliveryTransport};
use crate::{config::DeliveryConfig, error::TransportError, types::WorkItem};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Error body returned by the scoring API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Posts each work item as JSON to `{endpoint}/score`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &DeliveryConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let api_key = config.resolved_api_key().map(|key| key.trim().to_string());
        if api_key.is_none() {
            warn!(
                endpoint = %config.endpoint,
                "No api_key or SCOREPOST_API_KEY set, sending unauthenticated requests"
            );
        }

        Ok(Self {
            client,
            url: format!("{}/score", config.endpoint.trim_end_matches('/')),
            api_key,
        })
    }

    /// The URL items are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DeliveryTransport for HttpTransport {
    async fn send(&self, item: &WorkItem) -> Result<DeliveryOutcome, TransportError> {
        let mut request = self.client.post(&self.url).json(item);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(uri = %item.uri, %status, "Score delivered");
            return Ok(DeliveryOutcome::Delivered);
        }

        let body = response.text().await.unwrap_or_default();
        let outcome = classify(status, &body);

        warn!(uri = %item.uri, %status, ?outcome, "Score rejected");
        Ok(outcome)
    }
}

/// Map a non-success status and its body to an outcome.
fn classify(status: StatusCode, body: &str) -> DeliveryOutcome {
    let message = error_message(status, body);

    if status.is_client_error() {
        DeliveryOutcome::ClientError(message)
    } else if status.is_server_error() {
        DeliveryOutcome::ServerError(message)
    } else {
        DeliveryOutcome::ServerError(format!("unexpected status: {message}"))
    }
}

/// The `message` field of a JSON error body, or `HTTP <status>: <body>`.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| format!("HTTP {}: {}", status.as_u16(), body.trim()),
        |parsed| parsed.message,
    )
}

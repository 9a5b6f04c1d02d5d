//! Builder for single-part RFC 5322 messages.

use std::fmt::Write;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};

use super::error::{ClientError, Result};

/// Encoded body lines stay well inside the 998 octet line limit of RFC 5321.
const BODY_LINE_LENGTH: usize = 76;

/// Builds an RFC 5322 message with an HTML or plain text body.
///
/// `Date` and `Message-ID` are filled in at build time unless set explicitly.
/// The body is sent base64 encoded, so its content never affects line length.
///
/// ```
/// use scorepost_smtp::client::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .from("scorepost@example.com")
///     .to("ops@example.com")
///     .subject("Content Scoring Error")
///     .html_body("<h1>Oops</h1>")
///     .build()
///     .unwrap();
///
/// assert!(message.contains("Content-Type: text/html; charset=utf-8"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    subject: Option<String>,
    date: Option<DateTime<Utc>>,
    message_id: Option<String>,
    body: String,
    html: bool,
}

impl MessageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(email.into());
        self
    }

    /// Adds a recipient to the To header.
    #[must_use]
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.to.push(email.into());
        self
    }

    #[must_use]
    pub fn to_multiple<S: ToString>(mut self, emails: &[S]) -> Self {
        self.to.extend(emails.iter().map(ToString::to_string));
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Overrides the generated `Message-ID` (angle brackets are added).
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets a plain text body.
    #[must_use]
    pub fn body(mut self, content: impl Into<String>) -> Self {
        self.body = content.into();
        self.html = false;
        self
    }

    #[must_use]
    pub fn html_body(mut self, content: impl Into<String>) -> Self {
        self.body = content.into();
        self.html = true;
        self
    }

    /// Renders the message with CRLF line endings and a base64 body. The
    /// result is not dot-stuffed; [`super::SmtpClient::send_data`] does that
    /// on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BuilderError`] if there is no sender or no
    /// recipient, or if a header value contains a line break.
    pub fn build(self) -> Result<String> {
        let from = self
            .from
            .ok_or_else(|| ClientError::BuilderError("Missing From".to_string()))?;

        if self.to.is_empty() {
            return Err(ClientError::BuilderError("Missing To".to_string()));
        }

        let domain = from.rsplit_once('@').map_or("localhost", |(_, d)| d);
        let message_id = self
            .message_id
            .unwrap_or_else(|| format!("{}@{domain}", ulid::Ulid::new()));
        let date = self.date.unwrap_or_else(Utc::now);

        let mut headers = vec![
            ("From".to_string(), from.clone()),
            ("To".to_string(), self.to.join(", ")),
        ];
        if let Some(subject) = self.subject {
            headers.push(("Subject".to_string(), subject));
        }
        headers.push(("Date".to_string(), date.to_rfc2822()));
        headers.push(("Message-ID".to_string(), format!("<{message_id}>")));
        headers.push(("MIME-Version".to_string(), "1.0".to_string()));
        headers.push((
            "Content-Type".to_string(),
            format!(
                "text/{}; charset=utf-8",
                if self.html { "html" } else { "plain" }
            ),
        ));
        headers.push((
            "Content-Transfer-Encoding".to_string(),
            "base64".to_string(),
        ));

        let mut message = String::with_capacity(512 + self.body.len());
        for (name, value) in &headers {
            if value.contains(['\r', '\n']) {
                return Err(ClientError::BuilderError(format!(
                    "Header {name} contains a line break"
                )));
            }
            let _ = write!(message, "{name}: {value}\r\n");
        }
        message.push_str("\r\n");

        let encoded = BASE64.encode(self.body.as_bytes());
        for (index, ch) in encoded.chars().enumerate() {
            if index > 0 && index % BODY_LINE_LENGTH == 0 {
                message.push_str("\r\n");
            }
            message.push(ch);
        }
        message.push_str("\r\n");

        Ok(message)
    }
}

//! Notifying a human once an envelope runs out of retries.

use std::collections::HashSet;

use scorepost_common::address::AddressList;

use crate::{
    error::EscalationError, transport::NotificationTransport, types::RetryEnvelope,
};

const HTML_HEADING: &str = "<h1>An error was found when updating the content score</h1>";

/// Plain text account of an exhausted envelope. Each distinct message is
/// listed once, in first-seen order.
#[must_use]
pub fn escalation_text(envelope: &RetryEnvelope, messages: &[String]) -> String {
    let mut seen = HashSet::new();
    let distinct: Vec<&str> = messages
        .iter()
        .map(String::as_str)
        .filter(|message| seen.insert(*message))
        .collect();

    format!(
        "Max number of retries reached for: {envelope}\nError message was: {}",
        distinct.join(",")
    )
}

/// The HTML body sent to recipients: a heading, two empty paragraphs, then
/// one paragraph per line of `text`.
#[must_use]
pub fn escalation_html(text: &str) -> String {
    let paragraphs = escape_html(text).replace('\n', "</p><p>");
    format!("{HTML_HEADING}<p></p><p></p><p>{paragraphs}</p>")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Parse `recipients`, render the message and hand it to `notifier`.
///
/// # Errors
///
/// - [`EscalationError::NoRecipients`] if `recipients` is blank.
/// - [`EscalationError::InvalidRecipient`] if any entry is malformed; nothing
///   is sent in that case.
/// - [`EscalationError::Notify`] if the notifier fails.
pub async fn escalate(
    notifier: &dyn NotificationTransport,
    recipients: &str,
    subject: &str,
    envelope: &RetryEnvelope,
    messages: &[String],
) -> Result<(), EscalationError> {
    let recipients = AddressList::parse_comma_separated(recipients)?;
    if recipients.is_empty() {
        return Err(EscalationError::NoRecipients);
    }

    let body = escalation_html(&escalation_text(envelope, messages));
    notifier.notify(&recipients, subject, &body).await?;

    Ok(())
}

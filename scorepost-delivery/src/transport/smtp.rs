use async_trait::async_trait;
use scorepost_common::{address::Address, outgoing};
use scorepost_smtp::{ClientError, MessageBuilder, SmtpClient};
use tracing::{debug, info, warn};

use super::NotificationTransport;
use crate::{config::SmtpNotifierConfig, error::NotifyError};

/// Sends escalation mail through an SMTP relay.
///
/// Every recipient must be accepted before `DATA` is sent: if the relay
/// rejects any of them the transaction is reset and nobody is mailed.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: SmtpNotifierConfig,
}

impl SmtpNotifier {
    #[must_use]
    pub const fn new(config: SmtpNotifierConfig) -> Self {
        Self { config }
    }

    async fn transaction(
        &self,
        recipients: &[Address],
        subject: &str,
        body_html: &str,
    ) -> Result<(), NotifyError> {
        let mut client = SmtpClient::connect(&self.config.relay).await?;

        client.read_greeting().await?.into_result()?;

        let ehlo = client.ehlo(&self.config.helo).await?;
        if ehlo.is_error() {
            debug!(code = ehlo.code, "EHLO refused, falling back to HELO");
            client.helo(&self.config.helo).await?.into_result()?;
        }

        client.mail_from(&self.config.from).await?.into_result()?;

        for recipient in recipients {
            let address = recipient.to_string();
            let response = client.rcpt_to(&address).await?;

            if response.is_error() {
                warn!(recipient = %address, code = response.code, "Relay rejected escalation recipient");
                // Best effort: the transaction is abandoned either way
                let _ = client.rset().await;
                let _ = client.quit().await;

                return Err(NotifyError::RecipientRejected {
                    recipient: address,
                    code: response.code,
                    message: response.message(),
                });
            }
        }

        let data = client.data().await?.into_result()?;
        if !data.is_intermediate() {
            return Err(ClientError::SmtpError {
                code: data.code,
                message: data.message(),
            }
            .into());
        }

        let message = MessageBuilder::new()
            .from(&self.config.from)
            .to_multiple(recipients)
            .subject(subject)
            .html_body(body_html)
            .build()?;

        client.send_data(&message).await?;
        let _ = client.quit().await;

        Ok(())
    }
}

#[async_trait]
impl NotificationTransport for SmtpNotifier {
    async fn notify(
        &self,
        recipients: &[Address],
        subject: &str,
        body_html: &str,
    ) -> Result<(), NotifyError> {
        outgoing!(
            level = DEBUG,
            "Sending escalation to {} recipient(s) via {}",
            recipients.len(),
            self.config.relay
        );

        let timeout = self.config.timeout();
        tokio::time::timeout(timeout, self.transaction(recipients, subject, body_html))
            .await
            .map_err(|_| NotifyError::Timeout(timeout))??;

        info!(relay = %self.config.relay, recipients = recipients.len(), "Escalation sent");
        Ok(())
    }
}

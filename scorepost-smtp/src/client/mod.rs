//! SMTP client implementation.
//!
//! # Example
//!
//! ```no_run
//! use scorepost_smtp::client::{MessageBuilder, SmtpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = SmtpClient::connect("localhost:25").await?;
//! client.read_greeting().await?;
//! client.ehlo("scorepost.example.com").await?;
//! client.mail_from("scorepost@example.com").await?;
//! client.rcpt_to("ops@example.com").await?;
//! client.data().await?;
//!
//! let message = MessageBuilder::new()
//!     .from("scorepost@example.com")
//!     .to("ops@example.com")
//!     .subject("Content Scoring Error")
//!     .html_body("<p>Hello</p>")
//!     .build()?;
//!
//! client.send_data(&message).await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod message;
mod response;
mod smtp_client;

pub use error::{ClientError, Result};
pub use message::MessageBuilder;
pub use response::{Response, ResponseLine};
pub use smtp_client::{SmtpClient, dot_stuff};

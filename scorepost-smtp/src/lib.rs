//! SMTP submission client for scorepost.
//!
//! Only what escalation mail needs is implemented: a plain TCP session,
//! the envelope commands, `DATA` with dot-stuffing, and a builder for
//! single-part HTML messages.

pub mod client;

pub use client::{ClientError, MessageBuilder, Response, SmtpClient};

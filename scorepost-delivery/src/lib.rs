//! Batched delivery of content scores with bounded retry and escalation.
//!
//! Producers [`put`](DeliveryQueue::put) work items into a queue; a single
//! worker task delivers them in batches over a [`DeliveryTransport`],
//! retries the failures at a fixed pacing interval, and once an envelope of
//! failures exhausts its attempts sends an HTML alert through a
//! [`NotificationTransport`]. [`DeliveryService`] owns the active queue and
//! carries undelivered work across configuration changes.

mod batch;
pub mod config;
mod error;
pub mod escalation;
mod policy;
pub mod queue;
mod service;
pub mod transport;
mod types;

pub use batch::{BatchFailures, deliver_batch};
pub use config::{DeliveryConfig, SmtpNotifierConfig};
pub use error::{
    ConfigError, DeliveryError, EscalationError, NotifyError, ScoreError, TransportError,
};
pub use policy::RetryPolicy;
pub use queue::DeliveryQueue;
pub use service::DeliveryService;
pub use transport::{
    DeliveryOutcome, DeliveryTransport, HttpTransport, NotificationTransport, SmtpNotifier,
};
pub use types::{ContentScore, RetryEnvelope, WorkItem};

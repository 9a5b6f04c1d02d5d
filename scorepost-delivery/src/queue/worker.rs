//! The single background task that owns delivery for a queue.
//!
//! Each iteration:
//!
//! 1. With nothing queued anywhere, sleep until a `put` or `stop`.
//! 2. With fresh work in the inbox, wait one pacing interval, drain the whole
//!    inbox into a batch and deliver it. Failures become a new envelope at
//!    the back of the retry buffer.
//! 3. With envelopes waiting, wait one pacing interval and resend the oldest.
//!    Items that still fail stay in the envelope with one more attempt
//!    recorded; past the ceiling the envelope is escalated and dropped.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures_util::FutureExt;
use scorepost_common::internal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::Shared;
use crate::{batch::deliver_batch, escalation::escalate, types::RetryEnvelope};

pub(super) async fn run(shared: Arc<Shared>, mut stop: watch::Receiver<bool>) {
    internal!(level = DEBUG, "Delivery worker started");

    loop {
        if *stop.borrow() {
            break;
        }

        if shared.inbox.is_empty() && shared.retry_buffer.lock().is_empty() {
            tokio::select! {
                () = shared.inbox.notified() => {}
                _ = stop.wait_for(|stopped| *stopped) => break,
            }
            continue;
        }

        if !shared.inbox.is_empty() {
            if !pace(shared.policy.pacing_interval(), &mut stop).await {
                break;
            }
            shared.process_fresh().await;
        }

        if !shared.retry_buffer.lock().is_empty() {
            if !pace(shared.policy.pacing_interval(), &mut stop).await {
                break;
            }
            shared.process_retry().await;
        }
    }

    internal!(level = DEBUG, "Delivery worker stopped");
}

/// Wait out the pacing interval. Returns `false` if the queue was stopped
/// in the meantime.
async fn pace(interval: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    if interval.is_zero() {
        return true;
    }

    tokio::select! {
        biased;
        _ = stop.wait_for(|stopped| *stopped) => false,
        () = tokio::time::sleep(interval) => true,
    }
}

impl Shared {
    /// Drain the inbox and deliver it as one batch.
    pub(super) async fn process_fresh(&self) {
        let batch = self.inbox.drain();
        if batch.is_empty() {
            return;
        }

        debug!(items = batch.len(), "Delivering batch");
        let failures = deliver_batch(self.transport.as_ref(), &batch).await;

        if failures.is_empty() {
            debug!(items = batch.len(), "Batch delivered");
            return;
        }

        let (items, _) = failures.into_parts();
        warn!(
            failed = items.len(),
            total = batch.len(),
            "Batch partially failed, queueing for retry"
        );
        self.retry_buffer.lock().push_back(RetryEnvelope::new(items));
    }

    /// Resend the oldest envelope.
    pub(super) async fn process_retry(&self) {
        let Some(mut envelope) = self.retry_buffer.lock().pop_front() else {
            return;
        };

        let failures = deliver_batch(self.transport.as_ref(), &envelope.items).await;

        if failures.is_empty() {
            info!(
                items = envelope.items.len(),
                attempts = envelope.attempts,
                "Retry succeeded"
            );
            return;
        }

        let (items, messages) = failures.into_parts();
        envelope.items = items;
        envelope.attempts = envelope.attempts.saturating_add(1);

        if !self.policy.should_escalate(envelope.attempts) {
            debug!(
                items = envelope.items.len(),
                attempts = envelope.attempts,
                remaining = self.policy.remaining_attempts(envelope.attempts),
                "Retry failed, requeueing"
            );
            self.retry_buffer.lock().push_back(envelope);
            return;
        }

        error!(
            items = envelope.items.len(),
            attempts = envelope.attempts,
            "Retries exhausted, escalating"
        );

        let escalation = AssertUnwindSafe(escalate(
            self.notifier.as_ref(),
            &self.escalation.recipients,
            &self.escalation.subject,
            &envelope,
            &messages,
        ))
        .catch_unwind()
        .await;

        match escalation {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.is_configuration() => {
                error!(
                    error = %err,
                    envelope = %envelope,
                    "Escalation not sent, check escalation_recipients"
                );
            }
            Ok(Err(err)) => {
                error!(
                    error = %err,
                    temporary = err.is_temporary(),
                    envelope = %envelope,
                    "Failed to send escalation"
                );
            }
            Err(_) => error!(envelope = %envelope, "Escalation notifier panicked"),
        }
    }
}

//! Delivering a batch and collecting per-item failures.

use std::{any::Any, collections::HashMap, panic::AssertUnwindSafe};

use futures_util::FutureExt;
use tracing::{error, warn};

use crate::{
    error::TransportError,
    transport::{DeliveryOutcome, DeliveryTransport},
    types::WorkItem,
};

/// Items of a batch that were not delivered, in batch order, each with the
/// message explaining why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchFailures {
    entries: Vec<(WorkItem, String)>,
    positions: HashMap<WorkItem, usize>,
}

impl BatchFailures {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Record a failure. A later failure of an item already recorded replaces
    /// its message but keeps its position.
    fn record(&mut self, item: WorkItem, message: String) {
        if let Some(&position) = self.positions.get(&item) {
            self.entries[position].1 = message;
        } else {
            self.positions.insert(item.clone(), self.entries.len());
            self.entries.push((item, message));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(WorkItem, String)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(_, message)| message.as_str())
            .collect()
    }

    /// Split into the failed items and their messages.
    #[must_use]
    pub fn into_parts(self) -> (Vec<WorkItem>, Vec<String>) {
        self.entries.into_iter().unzip()
    }
}

/// Deliver every item of `batch` in order.
///
/// A `4xx` or `5xx` outcome fails just that item. A transport error or a panic
/// inside the transport fails the current item and every item after it, which
/// are then not attempted. Items delivered earlier in the batch stay delivered.
pub async fn deliver_batch(transport: &dyn DeliveryTransport, batch: &[WorkItem]) -> BatchFailures {
    let mut failures = BatchFailures::default();

    for (index, item) in batch.iter().enumerate() {
        let result = AssertUnwindSafe(transport.send(item))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(TransportError::Panicked(panic_message(&*payload))));

        match result {
            Ok(DeliveryOutcome::Delivered) => {}
            Ok(outcome @ (DeliveryOutcome::ClientError(_) | DeliveryOutcome::ServerError(_))) => {
                let message = outcome.failure_message().unwrap_or_default().to_string();
                warn!(uri = %item.uri, %message, "Delivery failed");
                failures.record(item.clone(), message);
            }
            Err(err) => {
                let remaining = batch.len() - index;
                if err.is_panic() {
                    error!(
                        uri = %item.uri,
                        error = %err,
                        remaining,
                        "Transport panicked, failing rest of batch"
                    );
                } else {
                    warn!(
                        uri = %item.uri,
                        error = %err,
                        timeout = err.is_timeout(),
                        remaining,
                        "Transport failed, failing rest of batch"
                    );
                }

                let message = err.to_string();
                for rest in &batch[index..] {
                    failures.record(rest.clone(), message.clone());
                }
                break;
            }
        }
    }

    failures
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

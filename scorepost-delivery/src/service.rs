//! Owner of the active delivery queue across configuration changes.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::{
    config::DeliveryConfig,
    error::DeliveryError,
    queue::DeliveryQueue,
    transport::{DeliveryTransport, NotificationTransport},
    types::{RetryEnvelope, WorkItem},
};

/// Holds exactly one running [`DeliveryQueue`] and swaps it out when the
/// configuration changes, carrying undelivered work across.
pub struct DeliveryService {
    queue: RwLock<DeliveryQueue>,
    notifier: Arc<dyn NotificationTransport>,
}

impl DeliveryService {
    /// Validate `config`, then build and start the first queue.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Config`] if the configuration is invalid.
    pub fn start(
        config: &DeliveryConfig,
        transport: Arc<dyn DeliveryTransport>,
        notifier: Arc<dyn NotificationTransport>,
    ) -> Result<Self, DeliveryError> {
        config.validate()?;

        let queue = DeliveryQueue::new(config, transport, Arc::clone(&notifier), Vec::new())?;
        queue.start();

        info!(endpoint = %config.endpoint, "Delivery service started");

        Ok(Self {
            queue: RwLock::new(queue),
            notifier,
        })
    }

    pub async fn submit(&self, item: WorkItem) {
        self.queue.read().await.put(item);
    }

    /// Replace the active queue with one built from `config`.
    ///
    /// The old queue is stopped and its worker awaited, so nothing is in
    /// flight when its pending work is captured. That work seeds the new
    /// queue's inbox; retry attempt counts start over. Returns the number of
    /// items carried across.
    ///
    /// An invalid `config` is rejected before anything is stopped and the
    /// old queue keeps running.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Config`] if the configuration is invalid.
    pub async fn reconfigure(
        &self,
        config: &DeliveryConfig,
        transport: Arc<dyn DeliveryTransport>,
    ) -> Result<usize, DeliveryError> {
        config.validate()?;

        let mut active = self.queue.write().await;
        let pending = active.shutdown().await;
        let carried = pending.len();

        let replacement =
            DeliveryQueue::new(config, transport, Arc::clone(&self.notifier), pending)?;
        replacement.start();
        *active = replacement;

        info!(endpoint = %config.endpoint, carried, "Delivery service reconfigured");
        Ok(carried)
    }

    pub async fn pending_work(&self) -> Vec<WorkItem> {
        self.queue.read().await.pending_work()
    }

    pub async fn retry_envelopes(&self) -> Vec<RetryEnvelope> {
        self.queue.read().await.retry_envelopes()
    }

    /// Stop the active queue and return what it had not delivered.
    pub async fn shutdown(&self) -> Vec<WorkItem> {
        let pending = self.queue.read().await.shutdown().await;
        info!(pending = pending.len(), "Delivery service stopped");
        pending
    }
}

//! The delivery queue: an inbox of fresh work, a buffer of failed batches
//! awaiting retry, and the worker task that moves items between them.

mod inbox;
mod worker;

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use scorepost_common::incoming;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, warn};

use self::inbox::Inbox;
use crate::{
    config::DeliveryConfig,
    error::ConfigError,
    policy::RetryPolicy,
    transport::{DeliveryTransport, NotificationTransport},
    types::{RetryEnvelope, WorkItem},
};

#[derive(Debug, Clone)]
struct EscalationSettings {
    recipients: String,
    subject: String,
}

/// State shared between the queue handle and its worker.
struct Shared {
    inbox: Inbox,
    retry_buffer: Mutex<VecDeque<RetryEnvelope>>,
    policy: RetryPolicy,
    escalation: EscalationSettings,
    transport: Arc<dyn DeliveryTransport>,
    notifier: Arc<dyn NotificationTransport>,
    stop: watch::Sender<bool>,
}

/// Batched delivery with bounded retry, driven by a single worker task.
///
/// Items are accepted with [`put`](Self::put) from any task or thread. The
/// worker is started explicitly with [`start`](Self::start) and stopped with
/// [`stop`](Self::stop) or [`shutdown`](Self::shutdown); whatever has not
/// been delivered can then be read back with
/// [`pending_work`](Self::pending_work) and seeded into a replacement queue.
pub struct DeliveryQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryQueue {
    /// Build a stopped-by-default queue whose inbox already holds `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMaxAttempts`] if `max_attempts` is zero.
    pub fn new(
        config: &DeliveryConfig,
        transport: Arc<dyn DeliveryTransport>,
        notifier: Arc<dyn NotificationTransport>,
        seed: Vec<WorkItem>,
    ) -> Result<Self, ConfigError> {
        if config.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.max_attempts));
        }

        let (stop, _) = watch::channel(false);

        Ok(Self {
            shared: Arc::new(Shared {
                inbox: Inbox::with_items(seed),
                retry_buffer: Mutex::new(VecDeque::new()),
                policy: config.retry_policy(),
                escalation: EscalationSettings {
                    recipients: config.escalation_recipients.clone(),
                    subject: config.escalation_subject.clone(),
                },
                transport,
                notifier,
                stop,
            }),
            worker: Mutex::new(None),
        })
    }

    /// Spawn the worker onto the current Tokio runtime. Calling this again
    /// while a worker exists has no effect.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) {
        let mut slot = self.worker.lock();
        if slot.is_some() {
            warn!("Delivery queue already started");
            return;
        }

        let stop = self.shared.stop.subscribe();
        *slot = Some(tokio::spawn(worker::run(Arc::clone(&self.shared), stop)));
    }

    /// Enqueue an item and wake the worker.
    pub fn put(&self, item: WorkItem) {
        incoming!("Queued {}", item);
        self.shared.inbox.push(item);
    }

    /// Ask the worker to stop. An in-flight delivery is allowed to finish.
    pub fn stop(&self) {
        self.shared.stop.send_replace(true);
        self.shared.inbox.wake();
    }

    /// Stop the worker, wait for it to exit, and return what was not delivered.
    pub async fn shutdown(&self) -> Vec<WorkItem> {
        self.stop();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && let Err(err) = worker.await
        {
            error!(error = %err, "Delivery worker terminated abnormally");
        }

        self.pending_work()
    }

    /// Everything queued but not in flight: inbox items first, then the
    /// items of each retry envelope, oldest envelope first.
    #[must_use]
    pub fn pending_work(&self) -> Vec<WorkItem> {
        let inbox = self.shared.inbox.lock();
        let retry_buffer = self.shared.retry_buffer.lock();

        inbox
            .iter()
            .cloned()
            .chain(
                retry_buffer
                    .iter()
                    .flat_map(|envelope| envelope.items.iter().cloned()),
            )
            .collect()
    }

    /// A copy of the envelopes currently awaiting retry.
    #[must_use]
    pub fn retry_envelopes(&self) -> Vec<RetryEnvelope> {
        self.shared.retry_buffer.lock().iter().cloned().collect()
    }

    /// Number of items waiting, in the inbox or in retry envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.inbox.len()
            + self
                .shared
                .retry_buffer
                .lock()
                .iter()
                .map(|envelope| envelope.items.len())
                .sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for DeliveryQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

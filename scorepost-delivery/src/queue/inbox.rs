use std::collections::VecDeque;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{Notify, futures::Notified};

use crate::types::WorkItem;

/// Unbounded multi-producer FIFO of fresh work, with a wake-up for the worker.
///
/// `push` leaves a permit on the [`Notify`] when the worker is not waiting,
/// so an item pushed between the worker's emptiness check and its wait is
/// never missed.
#[derive(Debug, Default)]
pub(crate) struct Inbox {
    items: Mutex<VecDeque<WorkItem>>,
    wakeup: Notify,
}

impl Inbox {
    pub(crate) fn with_items(items: Vec<WorkItem>) -> Self {
        Self {
            items: Mutex::new(items.into()),
            wakeup: Notify::new(),
        }
    }

    pub(crate) fn push(&self, item: WorkItem) {
        self.items.lock().push_back(item);
        self.wakeup.notify_one();
    }

    /// Take everything currently queued, oldest first.
    pub(crate) fn drain(&self) -> Vec<WorkItem> {
        self.items.lock().drain(..).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, VecDeque<WorkItem>> {
        self.items.lock()
    }

    pub(crate) fn notified(&self) -> Notified<'_> {
        self.wakeup.notified()
    }

    /// Wake the worker without adding work.
    pub(crate) fn wake(&self) {
        self.wakeup.notify_one();
    }
}

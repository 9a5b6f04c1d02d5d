//! Shared fakes for the delivery integration tests.
#![allow(dead_code)] // Test utility module - not all helpers used in every test
#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod mock_http;
pub mod mock_smtp;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use scorepost_common::address::Address;
use scorepost_delivery::{
    DeliveryOutcome, DeliveryTransport, NotificationTransport, NotifyError, TransportError,
    WorkItem,
};

type Behaviour =
    dyn Fn(&WorkItem, usize) -> Result<DeliveryOutcome, TransportError> + Send + Sync;

/// Delivery transport driven by a closure.
///
/// The closure receives the item and how many times that item has been sent
/// before, so tests can script "fail the first N times" behaviour.
pub struct FakeTransport {
    behaviour: Box<Behaviour>,
    calls: Mutex<Vec<(WorkItem, bool)>>,
}

impl FakeTransport {
    pub fn new(
        behaviour: impl Fn(&WorkItem, usize) -> Result<DeliveryOutcome, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Box::new(behaviour),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn always_ok() -> Arc<Self> {
        Self::new(|_, _| Ok(DeliveryOutcome::Delivered))
    }

    pub fn always_server_error() -> Arc<Self> {
        Self::new(|_, _| Ok(DeliveryOutcome::ServerError("HTTP 503: unavailable".to_string())))
    }

    /// Server error for every item whose URI is in `uris`, success otherwise.
    pub fn failing(uris: &[&str]) -> Arc<Self> {
        let uris: Vec<String> = uris.iter().map(ToString::to_string).collect();
        Self::new(move |item, _| {
            if uris.contains(&item.uri) {
                Ok(DeliveryOutcome::ServerError(format!("rejected {}", item.uri)))
            } else {
                Ok(DeliveryOutcome::Delivered)
            }
        })
    }

    /// Every call, in order.
    pub fn calls(&self) -> Vec<WorkItem> {
        self.calls.lock().iter().map(|(item, _)| item.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Items for which the transport answered `Delivered`, in order.
    pub fn delivered(&self) -> Vec<WorkItem> {
        self.calls
            .lock()
            .iter()
            .filter(|(_, delivered)| *delivered)
            .map(|(item, _)| item.clone())
            .collect()
    }
}

#[async_trait]
impl DeliveryTransport for FakeTransport {
    async fn send(&self, item: &WorkItem) -> Result<DeliveryOutcome, TransportError> {
        // Recorded before the behaviour runs so a panicking call still counts
        let (index, previous) = {
            let mut calls = self.calls.lock();
            let previous = calls.iter().filter(|(sent, _)| sent == item).count();
            calls.push((item.clone(), false));
            (calls.len() - 1, previous)
        };

        let result = (self.behaviour)(item, previous);

        if matches!(result, Ok(DeliveryOutcome::Delivered)) {
            self.calls.lock()[index].1 = true;
        }

        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_html: String,
}

/// Notification transport that records instead of sending.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl NotificationTransport for RecordingNotifier {
    async fn notify(
        &self,
        recipients: &[Address],
        subject: &str,
        body_html: &str,
    ) -> Result<(), NotifyError> {
        self.sent.lock().push(SentNotification {
            recipients: recipients.iter().map(ToString::to_string).collect(),
            subject: subject.to_string(),
            body_html: body_html.to_string(),
        });
        Ok(())
    }
}

pub fn item(uri: &str) -> WorkItem {
    WorkItem::new(uri, 5).unwrap()
}

/// Poll `condition` until it holds, failing the test after five seconds.
///
/// Only for tests running on the real clock.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within 5 seconds");
}

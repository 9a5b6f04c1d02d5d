//! Producer side of the binary: newline delimited JSON work items.
//!
//! Each line is one object of the form `{"uri": "...", "score": 0..=8}`.
//! Blank lines are skipped and malformed lines are logged and dropped, so one
//! bad record never stops the stream.

use std::sync::Arc;

use scorepost_common::{Signal, incoming, internal, tracing};
use scorepost_delivery::{DeliveryService, WorkItem};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::broadcast,
};

/// Parse one input line. `Ok(None)` for a blank line.
///
/// # Errors
///
/// Returns the JSON error if the line is not a valid work item, including a
/// score outside `0..=8`.
pub fn parse_line(line: &str) -> Result<Option<WorkItem>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line).map(Some)
}

/// Submit every item read from `reader` until end of input or a shutdown
/// signal. Returns the number of items accepted.
pub async fn run<R>(
    reader: R,
    service: Arc<DeliveryService>,
    mut shutdown: broadcast::Receiver<Signal>,
) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut accepted = 0;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown.recv() => break,
        };

        match line {
            Ok(Some(line)) => match parse_line(&line) {
                Ok(Some(item)) => {
                    incoming!(level = DEBUG, "Accepted {item}");
                    service.submit(item).await;
                    accepted += 1;
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, line = %line, "Ignoring malformed work item"),
            },
            Ok(None) => {
                internal!(level = INFO, "Producer input closed");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to read producer input");
                break;
            }
        }
    }

    accepted
}

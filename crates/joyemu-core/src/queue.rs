//! Bounded outbound report queue.
//!
//! Many producers (bootstrap, reader), one consumer (writer). Producers
//! suspend while the queue is full; how long is set by [`EnqueuePolicy`].

use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender, TryRecvError};
use thiserror::Error;

use crate::protocol::InputReport;

/// Default number of pending reports.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// What a producer does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnqueuePolicy {
    /// Wait until the writer frees a slot.
    #[default]
    Block,
    /// Wait at most this long, then drop the report.
    Timeout(Duration),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue full for {0:?}, report dropped")]
    Timeout(Duration),

    #[error("Queue closed")]
    Closed,
}

/// Producer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReportQueue {
    tx: Sender<InputReport>,
    policy: EnqueuePolicy,
}

/// Consumer half, owned by the writer.
#[derive(Debug)]
pub struct ReportReceiver {
    rx: Receiver<InputReport>,
}

/// Create a queue holding at most `capacity` reports.
pub fn report_queue(capacity: usize, policy: EnqueuePolicy) -> (ReportQueue, ReportReceiver) {
    let (tx, rx) = channel::bounded(capacity.max(1));
    (ReportQueue { tx, policy }, ReportReceiver { rx })
}

impl ReportQueue {
    /// Append a report, suspending per the policy while the queue is full.
    pub fn push(&self, report: InputReport) -> Result<(), QueueError> {
        match self.policy {
            EnqueuePolicy::Block => self.tx.send(report).map_err(|_| QueueError::Closed),
            EnqueuePolicy::Timeout(limit) => {
                self.tx.send_timeout(report, limit).map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => QueueError::Timeout(limit),
                    SendTimeoutError::Disconnected(_) => QueueError::Closed,
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }
}

impl ReportReceiver {
    /// Next report, suspending while empty. `None` once every producer is gone.
    pub fn pop(&self) -> Option<InputReport> {
        self.rx.recv().ok()
    }

    pub fn try_pop(&self) -> Option<InputReport> {
        match self.rx.try_recv() {
            Ok(report) => Some(report),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }
}

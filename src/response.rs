//! Single-use handoff of one operation result back to whoever is waiting for it.
//!
//! A child operation gets a `ResponseSender` as its response sink; the
//! orchestrator keeps the matching `ResponseChannel`. The sender accepts
//! exactly one value. Reading waits until that value arrives, or fails once
//! the sender is gone without having written.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::types::PartitionId;
use crate::wire::ResultValue;

/// Errors that can occur while delivering or awaiting a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// A response was already delivered through this sink; the later one was ignored.
    AlreadySent(PartitionId),

    /// Nobody is waiting for this response anymore.
    Closed(PartitionId),

    /// The sink was dropped before a response was delivered.
    Dropped(PartitionId),

    /// No response arrived within the configured wait.
    TimedOut {
        partition: PartitionId,
        timeout: Duration,
    },
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySent(p) => write!(f, "Response for partition {} was already sent", p),
            Self::Closed(p) => write!(f, "Nobody is waiting for the response of partition {}", p),
            Self::Dropped(p) => {
                write!(f, "Partition {} operation finished without responding", p)
            }
            Self::TimedOut { partition, timeout } => write!(
                f,
                "Partition {} did not respond within {:?}",
                partition, timeout
            ),
        }
    }
}

impl std::error::Error for ResponseError {}

/// Response sink stamped onto an operation before it runs.
pub trait ResponseHandler: Send + Sync {
    fn send_response(&self, value: ResultValue) -> Result<(), ResponseError>;
}

/// Write side of a response channel. The first value wins.
pub struct ResponseSender {
    partition: PartitionId,
    tx: Mutex<Option<oneshot::Sender<ResultValue>>>,
}

impl ResponseHandler for ResponseSender {
    fn send_response(&self, value: ResultValue) -> Result<(), ResponseError> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        let Some(tx) = tx else {
            tracing::warn!(partition = %self.partition, "Ignoring duplicate response");
            return Err(ResponseError::AlreadySent(self.partition));
        };

        tx.send(value).map_err(|_| {
            tracing::debug!(partition = %self.partition, "Response arrived after the waiter left");
            ResponseError::Closed(self.partition)
        })
    }
}

impl fmt::Debug for ResponseSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSender")
            .field("partition", &self.partition)
            .finish_non_exhaustive()
    }
}

/// Read side of a response channel, owned by the waiting orchestrator.
#[derive(Debug)]
pub struct ResponseChannel {
    partition: PartitionId,
    rx: oneshot::Receiver<ResultValue>,
}

impl ResponseChannel {
    pub fn partition(&self) -> PartitionId {
        self.partition
    }

    /// Wait for the response with no deadline.
    pub async fn recv(self) -> Result<ResultValue, ResponseError> {
        let partition = self.partition;
        self.rx.await.map_err(|_| ResponseError::Dropped(partition))
    }

    /// Wait for the response for at most `timeout`.
    pub async fn recv_timeout(self, timeout: Duration) -> Result<ResultValue, ResponseError> {
        let partition = self.partition;
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ResponseError::Dropped(partition)),
            Err(_) => Err(ResponseError::TimedOut { partition, timeout }),
        }
    }
}

/// Create a connected sender/channel pair for one partition.
pub fn response_channel(partition: PartitionId) -> (ResponseSender, ResponseChannel) {
    let (tx, rx) = oneshot::channel();
    (
        ResponseSender {
            partition,
            tx: Mutex::new(Some(tx)),
        },
        ResponseChannel { partition, rx },
    )
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Waiting for the commit queue to drain.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;

/// Timing for [`SettleWaiter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    /// Interval between checks in [`SettleWaiter::wait_polling`].
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// Extra wait after the queue is observed empty, covering a flush that has
    /// drained the buffers but not yet been observed by readers.
    #[serde(with = "millis")]
    pub grace: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            grace: Duration::from_millis(10),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Settle intervals are far below u64::MAX milliseconds."
        )]
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Errors from waiting on a queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettleError {
    /// The queue was dropped with requests still pending; it can never settle.
    #[error("commit queue dropped with {pending} pending requests")]
    QueueDropped {
        /// Pending count last published by the queue.
        pending: usize,
    },
}

/// Resolves once the owning [`CommitQueue`](crate::CommitQueue) has no pending requests.
///
/// Obtained from [`CommitQueue::settle_handle`](crate::CommitQueue::settle_handle).
/// Waiters are independent; cloning one does not affect the others.
#[derive(Clone, Debug)]
pub struct SettleWaiter {
    rx: watch::Receiver<usize>,
    config: SettleConfig,
}

impl SettleWaiter {
    pub(crate) fn new(rx: watch::Receiver<usize>, config: SettleConfig) -> Self {
        Self { rx, config }
    }

    /// Pending request count last published by the queue.
    pub fn pending(&self) -> usize {
        *self.rx.borrow()
    }

    /// True when nothing is pending right now.
    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    /// Wait until the queue is empty, then for the grace period.
    pub async fn wait(&mut self) -> Result<(), SettleError> {
        let observed = self.rx.wait_for(|pending| *pending == 0).await.map(|_| ());
        if observed.is_err() {
            return Err(SettleError::QueueDropped {
                pending: self.pending(),
            });
        }
        sleep(self.config.grace).await;
        Ok(())
    }

    /// Like [`wait`](Self::wait), but checks at a fixed interval instead of
    /// being woken by the queue.
    pub async fn wait_polling(&self) -> Result<(), SettleError> {
        loop {
            let pending = self.pending();
            if pending == 0 {
                break;
            }
            if self.rx.has_changed().is_err() {
                return Err(SettleError::QueueDropped { pending });
            }
            sleep(self.config.poll_interval).await;
        }
        sleep(self.config.grace).await;
        Ok(())
    }
}

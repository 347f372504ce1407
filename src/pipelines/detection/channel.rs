// SPDX-License-Identifier: GPL-3.0-only

//! Drop-oldest handoff between the worker and the driver
//!
//! A bounded crossbeam channel where the producer also keeps a receiving
//! handle. When the channel is full the producer pops the oldest item
//! itself and retries, so publishing never blocks and the consumer always
//! finds the freshest results.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use std::time::Duration;

/// What happened to a published item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Admitted without evicting anything
    Delivered,
    /// Admitted after evicting this many unconsumed items
    DroppedOldest(usize),
}

/// Result of a bounded wait on the consumer side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received<T> {
    Item(T),
    /// Nothing arrived within the timeout
    Timeout,
    /// The producer is gone and everything has been consumed
    Closed,
}

/// Producer half, owned by the worker
pub struct ResultPublisher<T> {
    sender: Sender<T>,
    evict: Receiver<T>,
}

/// Consumer half, owned by the driver
pub struct ResultReceiver<T> {
    receiver: Receiver<T>,
}

/// Create a handoff channel holding at most `capacity` items (minimum 1)
pub fn result_channel<T>(capacity: usize) -> (ResultPublisher<T>, ResultReceiver<T>) {
    let (sender, receiver) = bounded(capacity.max(1));
    (
        ResultPublisher {
            sender,
            evict: receiver.clone(),
        },
        ResultReceiver { receiver },
    )
}

impl<T> ResultPublisher<T> {
    /// Publish without blocking, evicting the oldest items if full
    pub fn publish(&self, item: T) -> PublishOutcome {
        let mut item = item;
        let mut dropped = 0;

        loop {
            match self.sender.try_send(item) {
                Ok(()) => break,
                Err(TrySendError::Full(rejected)) => {
                    item = rejected;
                    // The consumer may have emptied a slot in the meantime
                    if self.evict.try_recv().is_ok() {
                        dropped += 1;
                    }
                }
                // Unreachable while `evict` is alive
                Err(TrySendError::Disconnected(_)) => break,
            }
        }

        if dropped == 0 {
            PublishOutcome::Delivered
        } else {
            PublishOutcome::DroppedOldest(dropped)
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(1)
    }
}

impl<T> ResultReceiver<T> {
    /// Take the oldest pending item, if any
    pub fn try_recv(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next item
    pub fn recv_timeout(&self, timeout: Duration) -> Received<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Received::Item(item),
            Err(RecvTimeoutError::Timeout) => Received::Timeout,
            Err(RecvTimeoutError::Disconnected) => Received::Closed,
        }
    }

    /// Take everything currently pending, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Number of items waiting
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

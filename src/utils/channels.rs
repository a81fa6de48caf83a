//! Bounded admission queue between the control listener and the speech worker
//!
//! Producers never block: an insert into a full queue is rejected and the
//! newest item is dropped. The single consumer blocks until work arrives.

use crate::messages::TextItem;
use crate::{RelayError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::debug;

/// Smallest accepted queue capacity
pub const MIN_QUEUE_CAPACITY: usize = 1;

/// Largest accepted queue capacity
pub const MAX_QUEUE_CAPACITY: usize = 10;

/// Producer side of the admission queue. Cheap to clone; every control
/// message handler holds one.
#[derive(Clone, Debug)]
pub struct AdmissionQueue {
    tx: Sender<TextItem>,
    capacity: usize,
}

/// Consumer side of the admission queue. Deliberately not `Clone`: the
/// speech worker is the only reader.
#[derive(Debug)]
pub struct QueueConsumer {
    rx: Receiver<TextItem>,
}

/// Create a queue holding at most `capacity` pending items.
pub fn admission_queue(capacity: usize) -> Result<(AdmissionQueue, QueueConsumer)> {
    if !(MIN_QUEUE_CAPACITY..=MAX_QUEUE_CAPACITY).contains(&capacity) {
        return Err(RelayError::ConfigError(format!(
            "queue capacity must be between {} and {}, got {}",
            MIN_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY, capacity
        )));
    }

    let (tx, rx) = bounded(capacity);
    Ok((AdmissionQueue { tx, capacity }, QueueConsumer { rx }))
}

impl AdmissionQueue {
    /// Offer an item without blocking.
    ///
    /// Returns `false` when the queue is full or the worker has gone away.
    /// The rejected item is dropped; queued items are never evicted.
    pub fn try_enqueue(&self, item: TextItem) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => {
                debug!("Admitted item ({}/{} pending)", self.len(), self.capacity);
                true
            }
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => {
                debug!("Speech worker is gone, rejecting item");
                false
            }
        }
    }

    /// Number of items currently waiting
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl QueueConsumer {
    /// Block until the next item is available.
    ///
    /// Returns `None` once every producer has been dropped and the queue is
    /// drained.
    pub fn dequeue(&self) -> Option<TextItem> {
        self.rx.recv().ok()
    }

    /// Take the next item if one is already waiting
    pub fn try_dequeue(&self) -> Option<TextItem> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

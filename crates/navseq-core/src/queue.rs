#![forbid(unsafe_code)]

//! FIFO of transition requests that have not started yet.
//!
//! Insertion order is execution order. Nothing is reordered or coalesced:
//! `push A` followed by `pop` runs as two transitions so that each request
//! produces its own lifecycle notifications.
//!
//! # Thread Safety
//!
//! `RequestQueue` is not thread-safe. Concurrent producers are funnelled
//! through a single owner (see `navseq-runtime`), which is what makes
//! [`try_dequeue_front`](RequestQueue::try_dequeue_front) atomic with respect
//! to enqueues.

use std::collections::VecDeque;

use crate::descriptor::{RequestId, TransitionDescriptor};
use crate::gate::CompletionGate;

/// A descriptor together with the id it was assigned on enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRequest<P> {
    pub id: RequestId,
    pub descriptor: TransitionDescriptor<P>,
}

/// Ordered buffer of pending transition descriptors.
#[derive(Debug, Clone)]
pub struct RequestQueue<P> {
    entries: VecDeque<QueuedRequest<P>>,
    next_id: u64,
}

impl<P> Default for RequestQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> RequestQueue<P> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty queue with room for `capacity` requests.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            next_id: 1,
        }
    }

    /// Append a descriptor to the back. Never fails.
    pub fn enqueue(&mut self, descriptor: TransitionDescriptor<P>) -> RequestId {
        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        crate::trace!(
            target: "navseq.queue",
            id = id.get(),
            operation = descriptor.kind().as_str(),
            animated = descriptor.animated(),
            pending = self.entries.len() + 1,
            "request enqueued"
        );
        self.entries.push_back(QueuedRequest { id, descriptor });
        id
    }

    /// Remove the front request if there is one and `gate` is idle.
    pub fn try_dequeue_front(&mut self, gate: &CompletionGate) -> Option<QueuedRequest<P>> {
        if !gate.is_idle() {
            return None;
        }
        self.entries.pop_front()
    }

    /// Remove a pending request by id.
    ///
    /// Returns `false` if the request already left the queue (started,
    /// skipped, or cancelled before).
    pub fn cancel(&mut self, id: RequestId) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        self.entries.remove(index);
        crate::debug!(target: "navseq.queue", id = id.get(), "pending request cancelled");
        true
    }

    /// Remove every pending request, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        if dropped > 0 {
            crate::debug!(target: "navseq.queue", dropped, "pending requests cleared");
        }
        dropped
    }

    #[must_use]
    pub fn peek_front(&self) -> Option<&QueuedRequest<P>> {
        self.entries.front()
    }

    /// Pending requests, front to back.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedRequest<P>> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

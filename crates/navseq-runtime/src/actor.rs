#![forbid(unsafe_code)]

//! The actor loop that owns the serializer.
//!
//! Commands are applied strictly in arrival order, one at a time, and a fresh
//! [`SurfaceSnapshot`] is published after each one. This loop is the single
//! serialization point for queue, gate, and gesture state.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, mpsc};

use arc_swap::ArcSwap;
use navseq_core::{RequestId, Serializer, StackManager};

use crate::mailbox::{Command, Ticket};
use crate::snapshot::SurfaceSnapshot;

enum Flow {
    Continue,
    Reply(mpsc::Sender<()>),
    Stop,
}

pub(crate) struct Actor<P, S> {
    serializer: Serializer<P, S>,
    receiver: mpsc::Receiver<Command<P>>,
    snapshot: Arc<ArcSwap<SurfaceSnapshot>>,
    tickets: HashMap<Ticket, RequestId>,
    processed: u64,
}

impl<P, S> Actor<P, S>
where
    P: Clone + PartialEq + fmt::Debug,
    S: StackManager<P>,
{
    pub(crate) fn new(
        serializer: Serializer<P, S>,
        receiver: mpsc::Receiver<Command<P>>,
        snapshot: Arc<ArcSwap<SurfaceSnapshot>>,
    ) -> Self {
        Self {
            serializer,
            receiver,
            snapshot,
            tickets: HashMap::new(),
            processed: 0,
        }
    }

    pub(crate) fn run(mut self) {
        let span = tracing::info_span!("navseq.surface");
        let _guard = span.enter();
        tracing::debug!(target: "navseq.surface", "surface actor started");

        while let Ok(command) = self.receiver.recv() {
            self.processed += 1;
            let flow = self.apply(command);
            self.prune_tickets();
            self.publish(false);
            match flow {
                Flow::Continue => {}
                Flow::Reply(reply) => {
                    // The caller may have given up waiting.
                    let _ = reply.send(());
                }
                Flow::Stop => break,
            }
        }

        self.publish(true);
        tracing::debug!(
            target: "navseq.surface",
            processed = self.processed,
            pending = self.serializer.pending_len(),
            "surface actor stopped"
        );
    }

    fn apply(&mut self, command: Command<P>) -> Flow {
        tracing::trace!(target: "navseq.surface", command = command.label(), "command");
        match command {
            Command::Submit { ticket, descriptor } => {
                let id = self.serializer.submit(descriptor);
                self.tickets.insert(ticket, id);
            }
            Command::Cancel(ticket) => {
                let cancelled = self
                    .tickets
                    .remove(&ticket)
                    .is_some_and(|id| self.serializer.cancel_pending(id));
                tracing::debug!(
                    target: "navseq.surface",
                    ticket = ticket.get(),
                    cancelled,
                    "cancel requested"
                );
            }
            Command::ClearPending => {
                self.serializer.clear_pending();
            }
            Command::Notify(notification) => self.serializer.handle_notification(notification),
            Command::GestureBegan => {
                self.serializer.gesture_began();
            }
            Command::GestureChanged(progress) => self.serializer.gesture_changed(progress),
            Command::GestureEnded(outcome) => self.serializer.gesture_ended(outcome),
            Command::AddObserver(observer) => {
                self.serializer.add_boxed_observer(observer);
            }
            Command::Sync(reply) => return Flow::Reply(reply),
            Command::Shutdown => return Flow::Stop,
        }
        Flow::Continue
    }

    /// Forget tickets whose requests have left the queue.
    ///
    /// Request ids are assigned in FIFO order, so anything older than the
    /// front of the queue has started, been skipped, or been cancelled.
    fn prune_tickets(&mut self) {
        if self.tickets.is_empty() {
            return;
        }
        match self.serializer.pending().next().map(|request| request.id) {
            Some(front) => self.tickets.retain(|_, id| *id >= front),
            None => self.tickets.clear(),
        }
    }

    fn publish(&self, closed: bool) {
        let mut snapshot = SurfaceSnapshot::capture(&self.serializer, self.processed);
        snapshot.closed = closed;
        self.snapshot.store(Arc::new(snapshot));
    }
}

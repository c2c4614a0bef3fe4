#![forbid(unsafe_code)]

//! The serializer: releases queued transitions to the stack manager one at a time.
//!
//! # State Machine
//!
//! ```text
//!            queue non-empty, gate idle
//!   Idle ──────────────────────────────▶ InFlight
//!    ▲  ◀──────────────────────────────   │
//!    │        gate resolves                │
//!    └──── pump again (drain what is ready)┘
//! ```
//!
//! The pump is the only place a descriptor leaves the queue (apart from
//! explicit cancellation). It runs after every enqueue and after every
//! resolution, so a burst of requests issued back-to-back drains as fast as
//! the stack manager reports completions, and structural no-ops drain
//! without waiting at all.
//!
//! # Invariants
//!
//! 1. At most one transition is in flight; the completion gate enforces this
//!    and a violation panics.
//! 2. Requests reach the stack manager in submission order.
//! 3. A pop the stack cannot perform never reaches the stack manager.
//!
//! # Failure Modes
//!
//! - If the stack manager never delivers a terminal notification, the
//!   serializer stays `InFlight` indefinitely. There is no timeout;
//!   [`InFlight::elapsed`] is exposed so callers can observe a stall.
//! - Terminal notifications that arrive with nothing in flight are ignored
//!   and counted in [`SerializerStats::ignored_notifications`].

use std::fmt;

use web_time::{Duration, Instant};

use crate::config::NavConfig;
use crate::descriptor::{Direction, Origin, RequestId, TransitionDescriptor};
use crate::gate::{CompletionGate, Observation};
use crate::gesture::{GestureOutcome, InteractivePopAdapter};
use crate::notification::Notification;
use crate::observer::{LifecycleObserver, ObserverId, ObserverList};
use crate::queue::{QueuedRequest, RequestQueue};
use crate::stack::{Feasibility, StackManager, classify};

/// Coarse serializer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializerState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// A transition has been handed to the stack manager.
    InFlight,
}

impl SerializerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InFlight => "in_flight",
        }
    }
}

/// The transition currently owned by the serializer.
#[derive(Debug, Clone)]
pub struct InFlight<P> {
    pub id: RequestId,
    pub descriptor: TransitionDescriptor<P>,
    pub started_at: Instant,
}

impl<P> InFlight<P> {
    /// Time since the transition was handed to the stack manager.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Counters describing serializer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializerStats {
    /// Requests accepted into the queue (including synthesized gesture pops).
    pub enqueued: u64,
    /// Transitions handed to the stack manager.
    pub dispatched: u64,
    /// Pops dropped because the stack could not perform them.
    pub structural_noops: u64,
    /// Transitions whose terminal notification was consumed.
    pub resolved: u64,
    /// Terminal notifications that arrived with nothing in flight.
    pub ignored_notifications: u64,
    /// Terminal notifications whose direction did not match the armed operation.
    pub direction_mismatches: u64,
    /// Pending requests removed by cancellation or clearing.
    pub cancelled: u64,
    /// Interactive pop sessions started.
    pub gestures_started: u64,
    /// `gesture_began` signals that were ignored.
    pub gestures_ignored: u64,
}

/// Serializes transition requests against a [`StackManager`].
pub struct Serializer<P, S> {
    stack: S,
    queue: RequestQueue<P>,
    gate: CompletionGate,
    gesture: InteractivePopAdapter,
    in_flight: Option<InFlight<P>>,
    observers: ObserverList<P>,
    stats: SerializerStats,
}

impl<P: fmt::Debug, S> fmt::Debug for Serializer<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("in_flight", &self.in_flight)
            .field("pending", &self.queue.len())
            .field("gate", &self.gate.state())
            .field("gesture", &self.gesture.session())
            .field("observers", &self.observers)
            .finish()
    }
}

impl<P, S> Serializer<P, S>
where
    P: Clone + PartialEq + fmt::Debug,
    S: StackManager<P>,
{
    /// Create a serializer with default configuration.
    #[must_use]
    pub fn new(stack: S) -> Self {
        Self::with_config(stack, &NavConfig::default())
    }

    /// Create a serializer with the given configuration.
    #[must_use]
    pub fn with_config(stack: S, config: &NavConfig) -> Self {
        Self {
            stack,
            queue: RequestQueue::with_capacity(config.queue.initial_capacity),
            gate: CompletionGate::new(),
            gesture: InteractivePopAdapter::new(config.gesture.clone()),
            in_flight: None,
            observers: ObserverList::new(),
            stats: SerializerStats::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Caller-facing requests
    // -----------------------------------------------------------------------

    /// Push `panel`. Returns immediately; the push runs when its turn comes.
    pub fn request_push(&mut self, panel: P, animated: bool) {
        self.submit(TransitionDescriptor::push(panel, animated));
    }

    /// Pop the top panel. A pop with nothing to pop is a silent no-op.
    pub fn request_pop(&mut self, animated: bool) {
        self.submit(TransitionDescriptor::pop(animated));
    }

    /// Pop everything above the root panel.
    pub fn request_pop_to_root(&mut self, animated: bool) {
        self.submit(TransitionDescriptor::pop_to_root(animated));
    }

    /// Pop until `panel` is the top. A no-op if `panel` is not on the stack
    /// when the request runs.
    pub fn request_pop_to(&mut self, panel: P, animated: bool) {
        self.submit(TransitionDescriptor::pop_to(panel, animated));
    }

    /// Enqueue a descriptor and start it if nothing is in flight.
    pub fn submit(&mut self, descriptor: TransitionDescriptor<P>) -> RequestId {
        let id = self.queue.enqueue(descriptor);
        self.stats.enqueued += 1;
        self.pump();
        id
    }

    /// Remove a request that has not started yet.
    ///
    /// Returns `false` for requests that are in flight or already finished.
    pub fn cancel_pending(&mut self, id: RequestId) -> bool {
        let removed = self.queue.cancel(id);
        if removed {
            self.stats.cancelled += 1;
        }
        removed
    }

    /// Remove every request that has not started yet.
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.queue.clear();
        self.stats.cancelled += dropped as u64;
        dropped
    }

    // -----------------------------------------------------------------------
    // Stack manager notifications
    // -----------------------------------------------------------------------

    /// Consume a lifecycle notification from the stack manager.
    pub fn handle_notification(&mut self, notification: Notification<P>) {
        crate::trace!(
            target: "navseq.serializer",
            phase = ?notification.phase,
            direction = notification.direction.as_str(),
            panel = ?notification.panel,
            "notification received"
        );
        let observation = self.gate.observe(&notification);
        self.observers.notify(&notification);
        if observation == Observation::Resolved {
            self.complete_in_flight();
            self.pump();
        }
    }

    // -----------------------------------------------------------------------
    // Interactive gesture
    // -----------------------------------------------------------------------

    /// A drag gesture started.
    ///
    /// Returns `true` if an interactive pop began. Ignored while a transition
    /// is in flight, while requests are pending, while a session is already
    /// active, or when the stack is too shallow to pop.
    pub fn gesture_began(&mut self) -> bool {
        let depth = self.stack.depth();
        let admitted = self
            .gesture
            .admit(self.in_flight.is_none(), self.queue.is_empty(), depth);
        if let Err(_rejection) = admitted {
            self.stats.gestures_ignored += 1;
            crate::debug!(
                target: "navseq.gesture",
                reason = _rejection.as_str(),
                "gesture began ignored"
            );
            return false;
        }

        let id = self.queue.enqueue(TransitionDescriptor::interactive_pop());
        self.stats.enqueued += 1;
        self.stats.gestures_started += 1;
        self.gesture.begin(id, depth);
        self.pump();
        true
    }

    /// Drag progress changed. Ignored without an active session.
    pub fn gesture_changed(&mut self, progress: f32) {
        if let Some(clamped) = self.gesture.update(progress) {
            self.stack.interactive_pop_progress(clamped);
        }
    }

    /// The drag ended.
    ///
    /// Both outcomes end the interactive pop: the stack manager restores or
    /// removes the panel, and a terminal pop notification is fed through the
    /// gate exactly as if the stack manager had completed a programmatic pop.
    pub fn gesture_ended(&mut self, outcome: GestureOutcome) {
        let Some(session) = self.gesture.end() else {
            crate::debug!(target: "navseq.gesture", "gesture ended without a session");
            return;
        };
        self.stack.interactive_pop_ended(outcome);

        let owns_gate = self
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.id == session.request);
        if !owns_gate {
            crate::warn!(
                target: "navseq.gesture",
                request = session.request.get(),
                "interactive pop no longer in flight; not resolving"
            );
            return;
        }

        crate::debug!(
            target: "navseq.gesture",
            request = session.request.get(),
            outcome = ?outcome,
            progress = session.progress,
            "interactive pop ended"
        );

        let observation = match self.stack.top() {
            Some(panel) => {
                let notification = Notification::did_show(panel, Direction::Pop);
                let observation = self.gate.observe(&notification);
                self.observers.notify(&notification);
                observation
            }
            None => self.gate.observe_terminal(Direction::Pop),
        };
        if observation == Observation::Resolved {
            self.complete_in_flight();
            self.pump();
        }
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Register a secondary listener for lifecycle notifications.
    pub fn add_observer(&mut self, observer: impl LifecycleObserver<P> + 'static) -> ObserverId {
        self.observers.add(Box::new(observer))
    }

    /// Register an already boxed observer.
    pub fn add_boxed_observer(&mut self, observer: Box<dyn LifecycleObserver<P>>) -> ObserverId {
        self.observers.add(observer)
    }

    /// Remove a previously registered observer.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> SerializerState {
        if self.in_flight.is_some() {
            SerializerState::InFlight
        } else {
            SerializerState::Idle
        }
    }

    /// Whether user interaction with the panels should be blocked.
    ///
    /// True for as long as a transition is in flight.
    #[must_use]
    pub fn is_interaction_blocked(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<&InFlight<P>> {
        self.in_flight.as_ref()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Pending requests, front to back.
    pub fn pending(&self) -> impl Iterator<Item = &QueuedRequest<P>> {
        self.queue.iter()
    }

    #[must_use]
    pub fn gate(&self) -> &CompletionGate {
        &self.gate
    }

    /// Progress of the active drag, if any.
    #[must_use]
    pub fn gesture_progress(&self) -> Option<f32> {
        self.gesture.session().map(|session| session.progress)
    }

    #[must_use]
    pub fn stats(&self) -> SerializerStats {
        SerializerStats {
            ignored_notifications: self.gate.ignored_count(),
            direction_mismatches: self.gate.mismatch_count(),
            ..self.stats
        }
    }

    /// Read-only access to the stack manager.
    #[must_use]
    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// Tear down the serializer, returning the stack manager.
    pub fn into_stack(self) -> S {
        self.stack
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Start queued transitions until one is in flight or the queue is empty.
    fn pump(&mut self) {
        while self.in_flight.is_none() {
            let Some(request) = self.queue.try_dequeue_front(&self.gate) else {
                return;
            };
            match classify(&self.stack, request.descriptor.operation()) {
                Feasibility::Perform => self.dispatch(request),
                Feasibility::NoOp(_reason) => {
                    self.stats.structural_noops += 1;
                    crate::debug!(
                        target: "navseq.serializer",
                        id = request.id.get(),
                        operation = request.descriptor.kind().as_str(),
                        reason = _reason,
                        "structural no-op"
                    );
                    if request.descriptor.origin() == Origin::Interactive {
                        self.gesture.end();
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, request: QueuedRequest<P>) {
        let QueuedRequest { id, descriptor } = request;
        let kind = descriptor.kind();
        let animated = descriptor.animated();

        if let Err(err) = self.gate.arm(kind, animated) {
            crate::error!(target: "navseq.serializer", error = %err, "single-flight violated");
            panic!("single-flight violated: {err}");
        }
        self.stats.dispatched += 1;
        crate::debug!(
            target: "navseq.serializer",
            id = id.get(),
            operation = kind.as_str(),
            animated,
            origin = ?descriptor.origin(),
            pending = self.queue.len(),
            "transition dispatched"
        );

        match descriptor.origin() {
            Origin::Programmatic => self
                .stack
                .perform_transition(descriptor.operation(), animated),
            Origin::Interactive => self.stack.interactive_pop_began(),
        }
        self.in_flight = Some(InFlight {
            id,
            descriptor,
            started_at: Instant::now(),
        });
    }

    fn complete_in_flight(&mut self) {
        self.gate.take_resolved();
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        self.stats.resolved += 1;
        crate::debug!(
            target: "navseq.serializer",
            id = flight.id.get(),
            operation = flight.descriptor.kind().as_str(),
            elapsed_us = flight.elapsed().as_micros() as u64,
            "transition complete"
        );
        if flight.descriptor.origin() == Origin::Interactive
            && self
                .gesture
                .session()
                .is_some_and(|session| session.request == flight.id)
        {
            crate::warn!(
                target: "navseq.gesture",
                id = flight.id.get(),
                "stack manager completed an interactive pop; closing session"
            );
            self.gesture.end();
        }
    }
}

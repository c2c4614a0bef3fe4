#![forbid(unsafe_code)]

//! Point-in-time view of the serializer, published by the actor.

use navseq_core::{OperationKind, Serializer, SerializerState, SerializerStats, StackManager};
use web_time::Duration;

/// Serializer state as of the last processed command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceSnapshot {
    pub state: SerializerState,
    /// Requests waiting behind the in-flight one.
    pub pending: usize,
    /// Operation currently in flight.
    pub in_flight: Option<OperationKind>,
    /// How long the in-flight transition had been running when published.
    pub in_flight_for: Option<Duration>,
    /// Progress of an active interactive pop.
    pub gesture_progress: Option<f32>,
    pub stats: SerializerStats,
    /// Commands processed by the actor so far.
    pub commands_processed: u64,
    /// Set once the actor has stopped.
    pub closed: bool,
}

impl SurfaceSnapshot {
    pub(crate) fn capture<P, S>(serializer: &Serializer<P, S>, commands_processed: u64) -> Self
    where
        P: Clone + PartialEq + std::fmt::Debug,
        S: StackManager<P>,
    {
        let in_flight = serializer.in_flight();
        Self {
            state: serializer.state(),
            pending: serializer.pending_len(),
            in_flight: in_flight.map(|flight| flight.descriptor.kind()),
            in_flight_for: in_flight.map(|flight| flight.elapsed()),
            gesture_progress: serializer.gesture_progress(),
            stats: serializer.stats(),
            commands_processed,
            closed: false,
        }
    }

    /// Whether user interaction should be blocked.
    #[must_use]
    pub fn is_interaction_blocked(&self) -> bool {
        self.state == SerializerState::InFlight
    }

    /// Nothing in flight and nothing pending.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.state == SerializerState::Idle && self.pending == 0
    }
}

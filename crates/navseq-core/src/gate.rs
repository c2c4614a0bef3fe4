#![forbid(unsafe_code)]

//! Completion gate for the transition currently in flight.
//!
//! # State Machine
//!
//! ```text
//!          arm()              Did notification        take_resolved()
//!   Idle ─────────▶ Armed ──────────────────▶ Resolved ───────────────▶ Idle
//! ```
//!
//! # Invariants
//!
//! 1. At most one transition is armed at any time. `arm()` on a non-idle gate
//!    returns [`AlreadyArmedError`].
//! 2. The first terminal notification after arming resolves the gate, whether
//!    or not its direction matches the armed operation. The stack manager is
//!    trusted to emit exactly one terminal notification per transition.
//! 3. `Will` notifications never resolve the gate.
//!
//! # Failure Modes
//!
//! - A terminal notification while idle (or already resolved) is ignored and
//!   counted. This happens when the stack was mutated outside the serializer.

use crate::descriptor::{Direction, OperationKind};
use crate::error::AlreadyArmedError;
use crate::notification::{Notification, Phase};

/// The transition the gate is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTransition {
    /// Expected operation.
    pub kind: OperationKind,
    /// Whether the transition animates.
    pub animated: bool,
    /// Whether the advisory `Will` notification has been seen.
    pub will_seen: bool,
}

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// Nothing outstanding.
    #[default]
    Idle,
    /// Waiting for the terminal notification.
    Armed(ArmedTransition),
    /// Terminal notification seen; not yet consumed by the serializer.
    Resolved(ArmedTransition),
}

/// What [`CompletionGate::observe`] did with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Advisory notification recorded against the armed transition.
    Recorded,
    /// Terminal notification resolved the armed transition.
    Resolved,
    /// Nothing was armed; the notification had no effect.
    Ignored,
}

/// Tracks the single in-flight transition.
#[derive(Debug, Clone, Default)]
pub struct CompletionGate {
    state: GateState,
    ignored: u64,
    mismatches: u64,
}

impl CompletionGate {
    /// Create an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate for `kind`.
    ///
    /// Fails if a transition is still armed or resolved-but-unconsumed.
    pub fn arm(&mut self, kind: OperationKind, animated: bool) -> Result<(), AlreadyArmedError> {
        match self.state {
            GateState::Idle => {
                self.state = GateState::Armed(ArmedTransition {
                    kind,
                    animated,
                    will_seen: false,
                });
                crate::trace!(
                    target: "navseq.gate",
                    operation = kind.as_str(),
                    animated,
                    "gate armed"
                );
                Ok(())
            }
            GateState::Armed(armed) | GateState::Resolved(armed) => Err(AlreadyArmedError {
                outstanding: armed.kind,
                attempted: kind,
            }),
        }
    }

    /// Feed a lifecycle notification into the gate.
    pub fn observe<P>(&mut self, notification: &Notification<P>) -> Observation {
        match notification.phase {
            Phase::Will => self.observe_will(),
            Phase::Did => self.observe_terminal(notification.direction),
        }
    }

    fn observe_will(&mut self) -> Observation {
        match &mut self.state {
            GateState::Armed(armed) => {
                armed.will_seen = true;
                Observation::Recorded
            }
            GateState::Idle | GateState::Resolved(_) => Observation::Ignored,
        }
    }

    /// Feed a terminal notification that carries no panel.
    pub fn observe_terminal(&mut self, direction: Direction) -> Observation {
        match self.state {
            GateState::Armed(armed) => {
                if armed.kind.direction() != direction {
                    self.mismatches += 1;
                    crate::warn!(
                        target: "navseq.gate",
                        armed = armed.kind.as_str(),
                        observed = direction.as_str(),
                        "terminal notification direction differs from armed operation"
                    );
                }
                self.state = GateState::Resolved(armed);
                crate::trace!(target: "navseq.gate", operation = armed.kind.as_str(), "gate resolved");
                Observation::Resolved
            }
            GateState::Idle | GateState::Resolved(_) => {
                self.ignored += 1;
                crate::debug!(
                    target: "navseq.gate",
                    observed = direction.as_str(),
                    "terminal notification with nothing armed; ignoring"
                );
                Observation::Ignored
            }
        }
    }

    /// Consume a resolution, returning the gate to idle.
    ///
    /// Returns the transition that completed, or `None` if the gate was not
    /// resolved (in which case the state is left untouched).
    pub fn take_resolved(&mut self) -> Option<ArmedTransition> {
        match self.state {
            GateState::Resolved(armed) => {
                self.state = GateState::Idle;
                Some(armed)
            }
            GateState::Idle | GateState::Armed(_) => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, GateState::Idle)
    }

    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self.state, GateState::Armed(_))
    }

    /// Terminal notifications that arrived with nothing armed.
    #[must_use]
    pub fn ignored_count(&self) -> u64 {
        self.ignored
    }

    /// Terminal notifications whose direction differed from the armed operation.
    #[must_use]
    pub fn mismatch_count(&self) -> u64 {
        self.mismatches
    }
}

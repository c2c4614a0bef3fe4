#![forbid(unsafe_code)]

//! Lifecycle notifications emitted by the stack manager.
//!
//! Every transition produces an advisory `Will` notification followed by a
//! terminal `Did` notification. Only `Did` moves the completion gate.

use crate::descriptor::Direction;

/// Lifecycle phase of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The new top is about to be shown. Advisory.
    Will,
    /// The new top is shown; the transition is complete. Terminal.
    Did,
}

/// A lifecycle notification for one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification<P> {
    /// Lifecycle phase.
    pub phase: Phase,
    /// Push ("did show new top") or pop ("did show new top after removal").
    pub direction: Direction,
    /// The panel that is (or is about to be) the top.
    pub panel: P,
}

impl<P> Notification<P> {
    /// `panel` is about to become the top.
    #[must_use]
    pub fn will_show(panel: P, direction: Direction) -> Self {
        Self {
            phase: Phase::Will,
            direction,
            panel,
        }
    }

    /// `panel` has become the top.
    #[must_use]
    pub fn did_show(panel: P, direction: Direction) -> Self {
        Self {
            phase: Phase::Did,
            direction,
            panel,
        }
    }

    /// Whether this notification ends a transition.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Did
    }
}

#![forbid(unsafe_code)]

//! Simulated stack manager.
//!
//! [`SimulatedStackManager`] applies every transition to an in-memory panel
//! list at once, but holds the lifecycle notifications it would report until
//! a test releases them through the paired [`SimController`]. That makes the
//! completion timing fully scripted.
//!
//! # Delivery modes
//!
//! | Mode | Who delivers notifications |
//! |------|----------------------------|
//! | [`Delivery::Manual`] | The test, via [`SimController::deliver_next`] into a `Serializer` |
//! | [`Delivery::Held`] | The test, via [`SimController::release_next`] into a `NotificationSink` |
//! | [`Delivery::Immediate`] | The simulator, into the sink, from inside `perform_transition` |
//!
//! The simulator also checks the single-flight contract from the stack
//! manager's side: a transition that starts while an earlier one has not yet
//! reported completion counts as an overlap violation.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use navseq_core::{
    Direction, GestureOutcome, Notification, Operation, Serializer, StackManager,
};
use navseq_runtime::NotificationSink;

/// How the simulator hands out its notifications.
pub enum Delivery<P> {
    /// Held until [`SimController::take_next`] or [`SimController::deliver_next`].
    Manual,
    /// Held until [`SimController::release_next`] sends them to the sink.
    Held(NotificationSink<P>),
    /// Sent to the sink as soon as the transition starts.
    Immediate(NotificationSink<P>),
}

impl<P> Delivery<P> {
    fn sink(&self) -> Option<&NotificationSink<P>> {
        match self {
            Self::Manual => None,
            Self::Held(sink) | Self::Immediate(sink) => Some(sink),
        }
    }
}

/// One call the serializer made on the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry<P> {
    Perform { operation: Operation<P>, animated: bool },
    InteractiveBegan,
    InteractiveProgress(f32),
    InteractiveEnded(GestureOutcome),
}

struct SimState<P> {
    panels: Vec<P>,
    journal: Vec<JournalEntry<P>>,
    outbox: VecDeque<Vec<Notification<P>>>,
    outstanding: usize,
    max_outstanding: usize,
    overlap_violations: usize,
}

impl<P> SimState<P> {
    fn start_transition(&mut self) {
        if self.outstanding > 0 {
            self.overlap_violations += 1;
            tracing::error!(
                target: "navseq.harness",
                outstanding = self.outstanding,
                "transition started while another is outstanding"
            );
        }
        self.outstanding += 1;
        self.max_outstanding = self.max_outstanding.max(self.outstanding);
    }

    fn finish_transition(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }
}

fn lock<P>(state: &Mutex<SimState<P>>) -> MutexGuard<'_, SimState<P>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`StackManager`] with scripted completion timing.
pub struct SimulatedStackManager<P> {
    state: Arc<Mutex<SimState<P>>>,
    delivery: Delivery<P>,
}

impl<P> fmt::Debug for SimulatedStackManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("SimulatedStackManager")
            .field("depth", &state.panels.len())
            .field("outstanding", &state.outstanding)
            .field("held", &state.outbox.len())
            .finish()
    }
}

impl<P: Clone + PartialEq> SimulatedStackManager<P> {
    /// A stack holding only `root`, delivering through the controller.
    #[must_use]
    pub fn manual(root: P) -> (Self, SimController<P>) {
        Self::with_delivery(vec![root], Delivery::Manual)
    }

    /// A stack holding only `root`, holding notifications for `sink`.
    #[must_use]
    pub fn held(root: P, sink: NotificationSink<P>) -> (Self, SimController<P>) {
        Self::with_delivery(vec![root], Delivery::Held(sink))
    }

    /// A stack holding only `root`, reporting to `sink` at once.
    #[must_use]
    pub fn immediate(root: P, sink: NotificationSink<P>) -> (Self, SimController<P>) {
        Self::with_delivery(vec![root], Delivery::Immediate(sink))
    }

    /// A stack holding `panels` (bottom first).
    #[must_use]
    pub fn with_delivery(panels: Vec<P>, delivery: Delivery<P>) -> (Self, SimController<P>) {
        let state = Arc::new(Mutex::new(SimState {
            panels,
            journal: Vec::new(),
            outbox: VecDeque::new(),
            outstanding: 0,
            max_outstanding: 0,
            overlap_violations: 0,
        }));
        let controller = SimController {
            state: Arc::clone(&state),
            sink: delivery.sink().cloned(),
        };
        (Self { state, delivery }, controller)
    }
}

impl<P: Clone + PartialEq> StackManager<P> for SimulatedStackManager<P> {
    fn depth(&self) -> usize {
        lock(&self.state).panels.len()
    }

    fn top(&self) -> Option<P> {
        lock(&self.state).panels.last().cloned()
    }

    fn contains(&self, panel: &P) -> bool {
        lock(&self.state).panels.contains(panel)
    }

    fn perform_transition(&mut self, operation: &Operation<P>, animated: bool) {
        let notifications = {
            let mut state = lock(&self.state);
            state.start_transition();
            state.journal.push(JournalEntry::Perform {
                operation: operation.clone(),
                animated,
            });
            match operation {
                Operation::Push(panel) => state.panels.push(panel.clone()),
                Operation::Pop => {
                    if state.panels.len() > 1 {
                        state.panels.pop();
                    }
                }
                Operation::PopToRoot => state.panels.truncate(1),
                Operation::PopTo(panel) => {
                    if let Some(index) = state.panels.iter().position(|p| p == panel) {
                        state.panels.truncate(index + 1);
                    }
                }
            }
            let direction = operation.direction();
            let Some(top) = state.panels.last().cloned() else {
                return;
            };
            vec![
                Notification::will_show(top.clone(), direction),
                Notification::did_show(top, direction),
            ]
        };

        match &self.delivery {
            Delivery::Immediate(sink) => {
                lock(&self.state).finish_transition();
                for notification in notifications {
                    sink.send(notification);
                }
            }
            Delivery::Manual | Delivery::Held(_) => {
                lock(&self.state).outbox.push_back(notifications);
            }
        }
    }

    fn interactive_pop_began(&mut self) {
        let mut state = lock(&self.state);
        state.start_transition();
        state.journal.push(JournalEntry::InteractiveBegan);
    }

    fn interactive_pop_progress(&mut self, progress: f32) {
        lock(&self.state)
            .journal
            .push(JournalEntry::InteractiveProgress(progress));
    }

    fn interactive_pop_ended(&mut self, outcome: GestureOutcome) {
        let mut state = lock(&self.state);
        state.journal.push(JournalEntry::InteractiveEnded(outcome));
        if outcome == GestureOutcome::Completed && state.panels.len() > 1 {
            state.panels.pop();
        }
        state.finish_transition();
    }
}

/// Test-side handle onto a [`SimulatedStackManager`].
pub struct SimController<P> {
    state: Arc<Mutex<SimState<P>>>,
    sink: Option<NotificationSink<P>>,
}

impl<P> Clone for SimController<P> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sink: self.sink.clone(),
        }
    }
}

impl<P: Clone> SimController<P> {
    /// Current panels, bottom first.
    #[must_use]
    pub fn panels(&self) -> Vec<P> {
        lock(&self.state).panels.clone()
    }

    /// Every call the serializer has made so far.
    #[must_use]
    pub fn journal(&self) -> Vec<JournalEntry<P>> {
        lock(&self.state).journal.clone()
    }

    /// Programmatic operations performed, in order.
    #[must_use]
    pub fn performed(&self) -> Vec<Operation<P>> {
        lock(&self.state)
            .journal
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Perform { operation, .. } => Some(operation.clone()),
                _ => None,
            })
            .collect()
    }

    /// Transitions started but not yet reported complete.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        lock(&self.state).outstanding
    }

    /// Highest number of simultaneously outstanding transitions seen.
    #[must_use]
    pub fn max_outstanding(&self) -> usize {
        lock(&self.state).max_outstanding
    }

    /// Transitions that started before the previous one completed.
    #[must_use]
    pub fn overlap_violations(&self) -> usize {
        lock(&self.state).overlap_violations
    }

    /// Transitions whose notifications are still held.
    #[must_use]
    pub fn held(&self) -> usize {
        lock(&self.state).outbox.len()
    }

    /// Take the notifications of the oldest held transition.
    ///
    /// The transition counts as complete from here on.
    pub fn take_next(&self) -> Option<Vec<Notification<P>>> {
        let mut state = lock(&self.state);
        let notifications = state.outbox.pop_front()?;
        state.finish_transition();
        Some(notifications)
    }

    /// Feed the oldest held transition's notifications into `serializer`.
    ///
    /// Returns `false` if nothing was held.
    pub fn deliver_next<S>(&self, serializer: &mut Serializer<P, S>) -> bool
    where
        P: PartialEq + fmt::Debug,
        S: StackManager<P>,
    {
        let Some(notifications) = self.take_next() else {
            return false;
        };
        for notification in notifications {
            serializer.handle_notification(notification);
        }
        true
    }

    /// Send the oldest held transition's notifications to the sink.
    ///
    /// Returns `false` if nothing was held or the simulator has no sink.
    pub fn release_next(&self) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        let Some(notifications) = self.take_next() else {
            return false;
        };
        for notification in notifications {
            sink.send(notification);
        }
        true
    }

    /// Report a terminal notification nobody asked for.
    pub fn send_spurious(&self, direction: Direction) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        let Some(top) = lock(&self.state).panels.last().cloned() else {
            return false;
        };
        sink.send(Notification::did_show(top, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navseq_core::{Phase, SerializerState};

    #[test]
    fn manual_holds_until_delivered() {
        let (sim, ctl) = SimulatedStackManager::manual(0u32);
        let mut serializer = Serializer::new(sim);
        serializer.request_push(1, true);
        assert_eq!(ctl.panels(), vec![0, 1]);
        assert_eq!(ctl.held(), 1);
        assert_eq!(serializer.state(), SerializerState::InFlight);

        assert!(ctl.deliver_next(&mut serializer));
        assert_eq!(serializer.state(), SerializerState::Idle);
        assert!(!ctl.deliver_next(&mut serializer));
    }

    #[test]
    fn notifications_name_the_new_top() {
        let (mut sim, ctl) =
            SimulatedStackManager::with_delivery(vec![0u32, 1, 2], Delivery::Manual);
        sim.perform_transition(&Operation::Pop, true);
        let notes = ctl.take_next().unwrap();
        assert_eq!(notes[0].phase, Phase::Will);
        assert_eq!(notes[1].panel, 1);
        assert_eq!(notes[1].direction, Direction::Pop);
    }

    #[test]
    fn overlap_is_counted() {
        let (mut sim, ctl) = SimulatedStackManager::manual(0u32);
        sim.perform_transition(&Operation::Push(1), false);
        sim.perform_transition(&Operation::Push(2), false);
        assert_eq!(ctl.overlap_violations(), 1);
        assert_eq!(ctl.max_outstanding(), 2);
    }

    #[test]
    fn release_without_sink_is_refused() {
        let (mut sim, ctl) = SimulatedStackManager::manual(0u32);
        sim.perform_transition(&Operation::Push(1), false);
        assert!(!ctl.release_next());
        assert_eq!(ctl.held(), 1);
    }
}

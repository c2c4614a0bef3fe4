#![forbid(unsafe_code)]

//! End-to-end serializer scenarios against the simulated stack manager.
//!
//! Run:
//!   cargo test -p navseq-harness --test serializer_scenarios

use navseq_core::{
    Direction, GateState, GestureOutcome, NavConfig, Notification, Operation, OperationKind, Origin,
    Serializer, SerializerState,
};
use navseq_harness::{Delivery, JournalEntry, SimulatedStackManager};

// ============================================================================
// Back-to-back requests
// ============================================================================

#[test]
fn second_push_waits_for_first_terminal() {
    let (sim, ctl) = SimulatedStackManager::manual(0u32);
    let mut serializer = Serializer::new(sim);

    serializer.request_push(1, false);
    serializer.request_push(2, true);
    assert_eq!(
        ctl.journal(),
        vec![JournalEntry::Perform {
            operation: Operation::Push(1),
            animated: false
        }]
    );

    // will_show alone does not release the next push
    let notes = ctl.take_next().unwrap();
    serializer.handle_notification(notes[0].clone());
    assert_eq!(ctl.performed().len(), 1);
    serializer.handle_notification(notes[1].clone());

    assert_eq!(
        ctl.journal(),
        vec![
            JournalEntry::Perform {
                operation: Operation::Push(1),
                animated: false
            },
            JournalEntry::Perform {
                operation: Operation::Push(2),
                animated: true
            },
        ]
    );
    assert!(ctl.deliver_next(&mut serializer));
    assert_eq!(ctl.panels(), vec![0, 1, 2]);
    assert_eq!(ctl.max_outstanding(), 1);
}

#[test]
fn pops_on_singleton_stack_never_reach_stack_manager() {
    let (sim, ctl) = SimulatedStackManager::manual(0u32);
    let mut serializer = Serializer::new(sim);

    serializer.request_pop(true);
    serializer.request_pop(true);
    serializer.request_pop(false);

    assert!(ctl.journal().is_empty());
    assert_eq!(ctl.panels(), vec![0]);
    assert_eq!(serializer.state(), SerializerState::Idle);
    assert_eq!(serializer.stats().structural_noops, 3);
    assert_eq!(serializer.pending_len(), 0);
}

#[test]
fn pop_to_top_and_missing_panel_are_noops() {
    let (sim, ctl) = SimulatedStackManager::with_delivery(vec![0u32, 1, 2], Delivery::Manual);
    let mut serializer = Serializer::new(sim);

    serializer.request_pop_to(2, true);
    serializer.request_pop_to(9, true);
    assert!(ctl.journal().is_empty());

    serializer.request_pop_to(0, true);
    assert_eq!(ctl.performed(), vec![Operation::PopTo(0)]);
    ctl.deliver_next(&mut serializer);
    assert_eq!(ctl.panels(), vec![0]);
}

#[test]
fn pop_to_root_runs_after_pushes() {
    let (sim, ctl) = SimulatedStackManager::manual(0u32);
    let mut serializer = Serializer::new(sim);

    serializer.request_push(1, true);
    serializer.request_push(2, true);
    serializer.request_pop_to_root(true);
    while ctl.deliver_next(&mut serializer) {}

    assert_eq!(
        ctl.performed(),
        vec![Operation::Push(1), Operation::Push(2), Operation::PopToRoot]
    );
    assert_eq!(ctl.panels(), vec![0]);
    assert_eq!(ctl.overlap_violations(), 0);
}

// ============================================================================
// Interactive pop
// ============================================================================

#[test]
fn cancelled_gesture_resolves_before_queued_push() {
    let (sim, ctl) = SimulatedStackManager::with_delivery(vec![0u32, 1], Delivery::Manual);
    let mut serializer = Serializer::new(sim);

    assert!(serializer.gesture_began());
    assert_eq!(serializer.state(), SerializerState::InFlight);
    assert!(matches!(
        serializer.gate().state(),
        GateState::Armed(armed) if armed.kind == OperationKind::Pop && armed.animated
    ));
    assert_eq!(
        serializer.in_flight().map(|f| f.descriptor.origin()),
        Some(Origin::Interactive)
    );

    serializer.request_push(2, true);
    assert!(ctl.performed().is_empty());

    serializer.gesture_changed(0.4);
    serializer.gesture_ended(GestureOutcome::Cancelled);

    assert_eq!(
        ctl.journal(),
        vec![
            JournalEntry::InteractiveBegan,
            JournalEntry::InteractiveProgress(0.4),
            JournalEntry::InteractiveEnded(GestureOutcome::Cancelled),
            JournalEntry::Perform {
                operation: Operation::Push(2),
                animated: true
            },
        ]
    );
    assert_eq!(ctl.panels(), vec![0, 1, 2]);
    assert_eq!(ctl.overlap_violations(), 0);
}

#[test]
fn completed_gesture_pops_the_panel() {
    let (sim, ctl) = SimulatedStackManager::with_delivery(vec![0u32, 1], Delivery::Manual);
    let mut serializer = Serializer::new(sim);
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&seen);
    serializer.add_observer(move |n: &Notification<u32>| sink.lock().unwrap().push(n.clone()));

    serializer.gesture_began();
    serializer.gesture_ended(GestureOutcome::Completed);

    assert_eq!(ctl.panels(), vec![0]);
    assert_eq!(serializer.state(), SerializerState::Idle);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Notification::did_show(0, Direction::Pop)]
    );
}

#[test]
fn gesture_while_in_flight_is_ignored() {
    let (sim, ctl) = SimulatedStackManager::with_delivery(vec![0u32, 1], Delivery::Manual);
    let mut serializer = Serializer::new(sim);

    serializer.request_push(2, true);
    let gate = serializer.gate().state();
    let pending = serializer.pending_len();

    assert!(!serializer.gesture_began());
    assert_eq!(serializer.gate().state(), gate);
    assert_eq!(serializer.pending_len(), pending);
    assert_eq!(serializer.gesture_progress(), None);

    // A stray end and change do nothing either.
    serializer.gesture_changed(0.5);
    serializer.gesture_ended(GestureOutcome::Completed);
    assert_eq!(serializer.state(), SerializerState::InFlight);
    assert!(
        !ctl.journal()
            .iter()
            .any(|e| matches!(e, JournalEntry::InteractiveBegan))
    );
}

#[test]
fn gesture_respects_config() {
    let mut config = NavConfig::default();
    config.gesture.enabled = false;
    let (sim, _ctl) = SimulatedStackManager::with_delivery(vec![0u32, 1], Delivery::Manual);
    let mut serializer = Serializer::with_config(sim, &config);
    assert!(!serializer.gesture_began());

    let mut config = NavConfig::default();
    config.gesture.min_depth = 3;
    let (sim, _ctl) = SimulatedStackManager::with_delivery(vec![0u32, 1], Delivery::Manual);
    let mut serializer = Serializer::with_config(sim, &config);
    assert!(!serializer.gesture_began());
    assert_eq!(serializer.stats().gestures_ignored, 1);
}

#[test]
fn gesture_on_root_is_ignored() {
    let (sim, ctl) = SimulatedStackManager::manual(0u32);
    let mut serializer = Serializer::new(sim);
    assert!(!serializer.gesture_began());
    assert!(ctl.journal().is_empty());
}

// ============================================================================
// Cancellation and stray notifications
// ============================================================================

#[test]
fn cancelled_request_is_skipped() {
    let (sim, ctl) = SimulatedStackManager::manual(0u32);
    let mut serializer = Serializer::new(sim);

    serializer.request_push(1, true);
    let doomed = serializer.submit(navseq_core::TransitionDescriptor::push(2, true));
    serializer.request_push(3, true);
    assert!(serializer.cancel_pending(doomed));
    assert!(!serializer.cancel_pending(doomed));

    while ctl.deliver_next(&mut serializer) {}
    assert_eq!(ctl.performed(), vec![Operation::Push(1), Operation::Push(3)]);
}

#[test]
fn stray_terminal_does_not_release_queue_early() {
    let (sim, ctl) = SimulatedStackManager::manual(0u32);
    let mut serializer = Serializer::new(sim);
    serializer.request_push(1, true);
    serializer.request_push(2, true);

    // A will_show for the wrong transition is not terminal.
    serializer.handle_notification(Notification::will_show(7, Direction::Push));
    assert_eq!(ctl.performed().len(), 1);
    assert_eq!(serializer.pending_len(), 1);
}

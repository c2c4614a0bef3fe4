#![forbid(unsafe_code)]

//! Navigation surface under concurrent producers.
//!
//! Run:
//!   cargo test -p navseq-runtime --test surface_concurrency

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use navseq_core::{
    Direction, GestureOutcome, NavConfig, Notification, Operation, OperationKind, Phase,
    SerializerState,
};
use navseq_harness::{Delivery, SimController, SimulatedStackManager};
use navseq_runtime::{Mailbox, NavigationSurface};

const STEP_LIMIT: usize = 10_000;

fn held_surface(panels: Vec<u32>) -> (NavigationSurface<u32>, SimController<u32>) {
    let mailbox = Mailbox::new();
    let (sim, ctl) = SimulatedStackManager::with_delivery(panels, Delivery::Held(mailbox.sink()));
    let surface = NavigationSurface::spawn(mailbox, sim, &NavConfig::default()).unwrap();
    (surface, ctl)
}

fn immediate_surface() -> (NavigationSurface<u32>, SimController<u32>) {
    let mailbox = Mailbox::new();
    let (sim, ctl) = SimulatedStackManager::immediate(0, mailbox.sink());
    let surface = NavigationSurface::spawn(mailbox, sim, &NavConfig::default()).unwrap();
    (surface, ctl)
}

/// Release held completions one by one until the surface is quiescent.
fn drain_held(surface: &NavigationSurface<u32>, ctl: &SimController<u32>) {
    for _ in 0..STEP_LIMIT {
        assert!(surface.sync());
        if surface.snapshot().is_quiescent() {
            return;
        }
        ctl.release_next();
    }
    panic!("surface did not drain: {:?}", surface.snapshot());
}

/// Sync until the surface is quiescent.
fn settle(surface: &NavigationSurface<u32>) {
    for _ in 0..STEP_LIMIT {
        assert!(surface.sync());
        if surface.snapshot().is_quiescent() {
            return;
        }
    }
    panic!("surface did not settle: {:?}", surface.snapshot());
}

fn pushed_panels(ops: &[Operation<u32>]) -> Vec<u32> {
    ops.iter().filter_map(|op| op.panel().copied()).collect()
}

#[test]
fn concurrent_producers_never_overlap() {
    let (surface, ctl) = held_surface(vec![0]);
    let producers: Vec<_> = (0..4u32)
        .map(|t| {
            let surface = surface.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    surface.request_push(t * 1000 + i + 1, i % 2 == 0);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    drain_held(&surface, &ctl);

    let performed = pushed_panels(&ctl.performed());
    assert_eq!(performed.len(), 100);
    assert_eq!(ctl.overlap_violations(), 0);
    assert_eq!(ctl.max_outstanding(), 1);

    // Each producer's requests keep their relative order.
    for t in 0..4u32 {
        let mine: Vec<u32> = performed
            .iter()
            .copied()
            .filter(|p| p / 1000 == t)
            .collect();
        let expected: Vec<u32> = (0..25).map(|i| t * 1000 + i + 1).collect();
        assert_eq!(mine, expected);
    }

    let snap = surface.snapshot();
    assert_eq!(snap.stats.resolved, 100);
    assert_eq!(snap.state, SerializerState::Idle);
    surface.shutdown().unwrap();
}

#[test]
fn immediate_completions_drain_on_their_own() {
    let (surface, ctl) = immediate_surface();
    let producers: Vec<_> = (0..2u32)
        .map(|t| {
            let surface = surface.clone();
            thread::spawn(move || {
                for i in 0..20 {
                    surface.request_push(t * 100 + i + 1, true);
                    surface.request_pop(true);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    settle(&surface);
    assert_eq!(ctl.overlap_violations(), 0);
    assert_eq!(ctl.performed().len(), 80);
    assert_eq!(ctl.panels(), vec![0]);
    surface.shutdown().unwrap();
}

#[test]
fn held_transition_blocks_interaction() {
    let (surface, ctl) = held_surface(vec![0]);
    surface.request_push(1, true);
    surface.request_push(2, true);
    assert!(surface.sync());

    let snap = surface.snapshot();
    assert!(snap.is_interaction_blocked());
    assert_eq!(snap.in_flight, Some(OperationKind::Push));
    assert_eq!(snap.pending, 1);
    assert!(snap.in_flight_for.is_some());
    assert_eq!(ctl.performed(), vec![Operation::Push(1)]);

    drain_held(&surface, &ctl);
    assert!(!surface.snapshot().is_interaction_blocked());
    surface.shutdown().unwrap();
}

#[test]
fn cancel_by_ticket_skips_request() {
    let (surface, ctl) = held_surface(vec![0]);
    surface.request_push(1, true);
    let doomed = surface.submit(navseq_core::TransitionDescriptor::push(2, true));
    surface.request_push(3, true);
    surface.cancel(doomed);
    drain_held(&surface, &ctl);

    assert_eq!(pushed_panels(&ctl.performed()), vec![1, 3]);
    assert_eq!(surface.snapshot().stats.cancelled, 1);
    surface.shutdown().unwrap();
}

#[test]
fn cancel_after_dispatch_has_no_effect() {
    let (surface, ctl) = held_surface(vec![0]);
    let first = surface.submit(navseq_core::TransitionDescriptor::push(1, true));
    assert!(surface.sync());
    surface.cancel(first);
    drain_held(&surface, &ctl);

    assert_eq!(pushed_panels(&ctl.performed()), vec![1]);
    assert_eq!(surface.snapshot().stats.cancelled, 0);
    surface.shutdown().unwrap();
}

#[test]
fn clear_pending_keeps_in_flight() {
    let (surface, ctl) = held_surface(vec![0]);
    for panel in 1..=5 {
        surface.request_push(panel, true);
    }
    surface.clear_pending();
    drain_held(&surface, &ctl);

    assert_eq!(pushed_panels(&ctl.performed()), vec![1]);
    assert_eq!(surface.snapshot().stats.cancelled, 4);
    surface.shutdown().unwrap();
}

#[test]
fn observers_see_every_notification() {
    let (surface, _ctl) = immediate_surface();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    surface.add_observer(move |n: &Notification<u32>| {
        sink.lock().unwrap().push((n.phase, n.direction, n.panel));
    });
    surface.request_push(4, true);
    surface.request_pop(true);
    settle(&surface);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Phase::Will, Direction::Push, 4),
            (Phase::Did, Direction::Push, 4),
            (Phase::Will, Direction::Pop, 0),
            (Phase::Did, Direction::Pop, 0),
        ]
    );
    surface.shutdown().unwrap();
}

#[test]
fn gesture_through_surface_runs_before_queued_push() {
    let (surface, ctl) = held_surface(vec![0, 1]);
    surface.gesture_began();
    surface.request_push(2, true);
    surface.gesture_changed(0.5);
    assert!(surface.sync());

    let snap = surface.snapshot();
    assert_eq!(snap.in_flight, Some(OperationKind::Pop));
    assert_eq!(snap.gesture_progress, Some(0.5));
    assert_eq!(snap.pending, 1);
    assert!(ctl.performed().is_empty());

    surface.gesture_ended(GestureOutcome::Cancelled);
    assert!(surface.sync());
    assert_eq!(ctl.performed(), vec![Operation::Push(2)]);

    drain_held(&surface, &ctl);
    assert_eq!(ctl.panels(), vec![0, 1, 2]);
    assert_eq!(surface.snapshot().stats.gestures_started, 1);
    surface.shutdown().unwrap();
}

#[test]
fn stray_notification_is_ignored() {
    let (surface, ctl) = held_surface(vec![0]);
    assert!(ctl.send_spurious(Direction::Pop));
    assert!(surface.sync());
    let snap = surface.snapshot();
    assert_eq!(snap.stats.ignored_notifications, 1);
    assert!(snap.is_quiescent());
    surface.shutdown().unwrap();
}

#[test]
fn shutdown_stops_processing() {
    let (surface, ctl) = held_surface(vec![0]);
    surface.request_push(1, true);
    surface.request_push(2, true);
    surface.shutdown().unwrap();

    let snap = surface.snapshot();
    assert!(snap.closed);
    assert_eq!(snap.pending, 1);

    surface.request_push(3, true);
    assert!(!surface.sync());
    assert_eq!(ctl.performed(), vec![Operation::Push(1)]);
}

#[test]
fn dropping_last_handle_stops_actor() {
    let (surface, ctl) = immediate_surface();
    let sink = surface.notification_sink();
    surface.request_push(1, true);
    settle(&surface);
    drop(surface);

    // The actor exits and drops its receiver; sends start failing.
    let mut closed = false;
    for _ in 0..5_000 {
        if !sink.send(Notification::did_show(0, Direction::Pop)) {
            closed = true;
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(closed);
    assert_eq!(ctl.performed(), vec![Operation::Push(1)]);
}

#![no_main]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use navseq_core::{
    Direction, GestureOutcome, Notification, Operation, Serializer, StackManager,
    TransitionDescriptor,
};

#[derive(Debug, Arbitrary)]
enum Step {
    Push(u8, bool),
    Pop(bool),
    PopToRoot(bool),
    PopTo(u8, bool),
    Cancel(u8),
    Clear,
    Deliver,
    DeliverWillOnly,
    Stray(bool),
    GestureBegan,
    GestureChanged(f32),
    GestureEnded(bool),
}

/// Stack that holds completions until the input releases them.
struct HeldStack {
    panels: Vec<u8>,
    held: Rc<RefCell<VecDeque<(u8, Direction)>>>,
    interactive: bool,
}

impl HeldStack {
    fn begin(&self) {
        assert!(
            self.held.borrow().is_empty() && !self.interactive,
            "overlapping transitions"
        );
    }
}

impl StackManager<u8> for HeldStack {
    fn depth(&self) -> usize {
        self.panels.len()
    }

    fn top(&self) -> Option<u8> {
        self.panels.last().copied()
    }

    fn contains(&self, panel: &u8) -> bool {
        self.panels.contains(panel)
    }

    fn perform_transition(&mut self, operation: &Operation<u8>, _animated: bool) {
        self.begin();
        match operation {
            Operation::Push(p) => self.panels.push(*p),
            Operation::Pop => {
                assert!(self.panels.len() > 1, "pop performed on root");
                self.panels.pop();
            }
            Operation::PopToRoot => {
                assert!(self.panels.len() > 1, "pop to root performed on root");
                self.panels.truncate(1);
            }
            Operation::PopTo(p) => {
                let index = self.panels.iter().position(|x| x == p);
                assert!(
                    index.is_some_and(|i| i + 1 < self.panels.len()),
                    "pop to impossible target"
                );
                if let Some(i) = index {
                    self.panels.truncate(i + 1);
                }
            }
        }
        let top = self.panels[self.panels.len() - 1];
        self.held.borrow_mut().push_back((top, operation.direction()));
    }

    fn interactive_pop_began(&mut self) {
        self.begin();
        self.interactive = true;
    }

    fn interactive_pop_ended(&mut self, outcome: GestureOutcome) {
        if outcome == GestureOutcome::Completed {
            self.panels.pop();
        }
        self.interactive = false;
    }
}

fuzz_target!(|steps: Vec<Step>| {
    let held = Rc::new(RefCell::new(VecDeque::new()));
    let mut serializer = Serializer::new(HeldStack {
        panels: vec![0],
        held: Rc::clone(&held),
        interactive: false,
    });
    let mut submitted = Vec::new();

    for step in steps.into_iter().take(512) {
        match step {
            Step::Push(p, a) => submitted.push(serializer.submit(TransitionDescriptor::push(p, a))),
            Step::Pop(a) => submitted.push(serializer.submit(TransitionDescriptor::pop(a))),
            Step::PopToRoot(a) => {
                submitted.push(serializer.submit(TransitionDescriptor::pop_to_root(a)));
            }
            Step::PopTo(p, a) => {
                submitted.push(serializer.submit(TransitionDescriptor::pop_to(p, a)));
            }
            Step::Cancel(n) => {
                if !submitted.is_empty() {
                    let id = submitted[n as usize % submitted.len()];
                    serializer.cancel_pending(id);
                }
            }
            Step::Clear => {
                serializer.clear_pending();
            }
            Step::Deliver => {
                let next = held.borrow_mut().pop_front();
                if let Some((panel, direction)) = next {
                    serializer.handle_notification(Notification::will_show(panel, direction));
                    serializer.handle_notification(Notification::did_show(panel, direction));
                }
            }
            Step::DeliverWillOnly => {
                let next = held.borrow().front().copied();
                if let Some((panel, direction)) = next {
                    serializer.handle_notification(Notification::will_show(panel, direction));
                }
            }
            Step::Stray(push) => {
                if serializer.in_flight().is_none() {
                    let direction = if push { Direction::Push } else { Direction::Pop };
                    serializer.handle_notification(Notification::did_show(0, direction));
                }
            }
            Step::GestureBegan => {
                serializer.gesture_began();
            }
            Step::GestureChanged(progress) => {
                serializer.gesture_changed(progress);
                if let Some(p) = serializer.gesture_progress() {
                    assert!((0.0..=1.0).contains(&p), "progress out of range");
                }
            }
            Step::GestureEnded(completed) => serializer.gesture_ended(if completed {
                GestureOutcome::Completed
            } else {
                GestureOutcome::Cancelled
            }),
        }

        assert!(serializer.stack().depth() >= 1, "root popped");
        assert_eq!(
            serializer.is_interaction_blocked(),
            serializer.in_flight().is_some()
        );
        if serializer.in_flight().is_none() {
            assert_eq!(serializer.pending_len(), 0, "idle with pending requests");
        }
    }
});

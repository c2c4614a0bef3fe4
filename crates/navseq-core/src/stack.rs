#![forbid(unsafe_code)]

//! Boundary with the underlying stack manager.
//!
//! The stack manager renders transitions and reports their lifecycle back to
//! the serializer. The serializer must be the only consumer of those
//! notifications; secondary listeners register a
//! [`LifecycleObserver`](crate::observer::LifecycleObserver) instead.

use crate::descriptor::Operation;
use crate::gesture::GestureOutcome;

/// The service that actually performs transitions.
///
/// # Contract
///
/// - [`perform_transition`](Self::perform_transition) is fire-and-forget and
///   must eventually lead to exactly one terminal (`Did`) notification being
///   delivered to the serializer. Delivery may happen later, from another
///   context; it must never happen re-entrantly from inside the call.
/// - The serializer never asks for an impossible transition. Pops the stack
///   cannot perform are classified as no-ops first (see [`classify`]).
/// - Interactive pops are driven by the gesture hooks. The stack manager must
///   not emit a terminal notification for them: the gesture adapter does.
pub trait StackManager<P> {
    /// Number of panels on the stack.
    fn depth(&self) -> usize;

    /// The visible top panel.
    fn top(&self) -> Option<P>;

    /// Whether `panel` is anywhere on the stack.
    fn contains(&self, panel: &P) -> bool;

    /// Start a transition.
    fn perform_transition(&mut self, operation: &Operation<P>, animated: bool);

    /// An interactive pop has started tracking a drag.
    fn interactive_pop_began(&mut self) {}

    /// Drag progress in `0.0..=1.0`.
    fn interactive_pop_progress(&mut self, _progress: f32) {}

    /// The drag ended; on [`GestureOutcome::Cancelled`] the stack manager
    /// restores the top panel.
    fn interactive_pop_ended(&mut self, _outcome: GestureOutcome) {}
}

impl<P, T: StackManager<P> + ?Sized> StackManager<P> for Box<T> {
    fn depth(&self) -> usize {
        (**self).depth()
    }

    fn top(&self) -> Option<P> {
        (**self).top()
    }

    fn contains(&self, panel: &P) -> bool {
        (**self).contains(panel)
    }

    fn perform_transition(&mut self, operation: &Operation<P>, animated: bool) {
        (**self).perform_transition(operation, animated);
    }

    fn interactive_pop_began(&mut self) {
        (**self).interactive_pop_began();
    }

    fn interactive_pop_progress(&mut self, progress: f32) {
        (**self).interactive_pop_progress(progress);
    }

    fn interactive_pop_ended(&mut self, outcome: GestureOutcome) {
        (**self).interactive_pop_ended(outcome);
    }
}

/// Whether an operation can run against the current stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feasibility {
    /// Hand the operation to the stack manager.
    Perform,
    /// Nothing to do; resolve immediately without calling the stack manager.
    NoOp(&'static str),
}

/// Classify `operation` against `stack`.
///
/// Pushes always perform. Pop-family operations that would leave nothing to
/// remove are structural no-ops.
pub fn classify<P, S>(stack: &S, operation: &Operation<P>) -> Feasibility
where
    P: PartialEq,
    S: StackManager<P> + ?Sized,
{
    match operation {
        Operation::Push(_) => Feasibility::Perform,
        Operation::Pop | Operation::PopToRoot if stack.depth() <= 1 => {
            Feasibility::NoOp("stack_at_root")
        }
        Operation::Pop | Operation::PopToRoot => Feasibility::Perform,
        Operation::PopTo(panel) => {
            if !stack.contains(panel) {
                Feasibility::NoOp("panel_not_on_stack")
            } else if stack.top().as_ref() == Some(panel) {
                Feasibility::NoOp("panel_already_top")
            } else {
                Feasibility::Perform
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<u32>);

    impl StackManager<u32> for Fixed {
        fn depth(&self) -> usize {
            self.0.len()
        }

        fn top(&self) -> Option<u32> {
            self.0.last().copied()
        }

        fn contains(&self, panel: &u32) -> bool {
            self.0.contains(panel)
        }

        fn perform_transition(&mut self, _operation: &Operation<u32>, _animated: bool) {}
    }

    #[test]
    fn push_always_performs() {
        assert_eq!(classify(&Fixed(vec![]), &Operation::Push(1)), Feasibility::Perform);
    }

    #[test]
    fn pop_on_singleton_is_noop() {
        let stack = Fixed(vec![1]);
        assert!(matches!(classify(&stack, &Operation::Pop), Feasibility::NoOp(_)));
        assert!(matches!(
            classify(&stack, &Operation::PopToRoot),
            Feasibility::NoOp(_)
        ));
        assert!(matches!(classify(&Fixed(vec![]), &Operation::Pop), Feasibility::NoOp(_)));
    }

    #[test]
    fn pop_with_depth_performs() {
        let stack = Fixed(vec![1, 2]);
        assert_eq!(classify(&stack, &Operation::Pop), Feasibility::Perform);
        assert_eq!(classify(&stack, &Operation::PopToRoot), Feasibility::Perform);
    }

    #[test]
    fn pop_to_rules() {
        let stack = Fixed(vec![1, 2, 3]);
        assert_eq!(classify(&stack, &Operation::PopTo(1)), Feasibility::Perform);
        assert_eq!(
            classify(&stack, &Operation::PopTo(3)),
            Feasibility::NoOp("panel_already_top")
        );
        assert_eq!(
            classify(&stack, &Operation::PopTo(9)),
            Feasibility::NoOp("panel_not_on_stack")
        );
    }

    #[test]
    fn boxed_stack_delegates() {
        let boxed: Box<dyn StackManager<u32>> = Box::new(Fixed(vec![4, 5]));
        assert_eq!(boxed.depth(), 2);
        assert_eq!(boxed.top(), Some(5));
        assert_eq!(classify(&boxed, &Operation::Pop), Feasibility::Perform);
    }
}

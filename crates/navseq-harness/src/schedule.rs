#![forbid(unsafe_code)]

//! Scripted interleavings of requests, completions, and gestures.
//!
//! [`run_schedule`] drives a [`Serializer`] over a [`SimulatedStackManager`]
//! in manual delivery mode, one [`ScheduleStep`] at a time, then drains
//! whatever is left. The returned [`ScheduleReport`] records which requests
//! ran, in which order, and how the simulator saw them, so properties such
//! as single-flight and FIFO order can be asserted directly.
//!
//! [`transition_storm`] generates long deterministic schedules from a seed.
//!
//! # JSONL Schema
//!
//! ```json
//! {"event":"schedule_start","steps":120,"root":0}
//! {"event":"step","idx":0,"step":"push","state":"in_flight","pending":0}
//! {"event":"schedule_complete","dispatched":57,"noops":12,"cancelled":3,"overlaps":0}
//! ```

use std::fmt;

use navseq_core::{
    Direction, GestureOutcome, NavConfig, Notification, Operation, Origin, RequestId, Serializer,
    SerializerStats, TransitionDescriptor,
};
use serde_json::json;

use crate::sim::SimulatedStackManager;

/// Upper bound on drain iterations after the last step.
const DRAIN_LIMIT: usize = 10_000;

/// One scripted input.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleStep<P> {
    Push(P, bool),
    Pop(bool),
    PopToRoot(bool),
    PopTo(P, bool),
    /// Cancel the n-th submitted request (modulo the number submitted).
    Cancel(usize),
    ClearPending,
    /// Release the oldest held completion, if any.
    Deliver,
    /// A terminal notification with nothing in flight. Skipped otherwise.
    SpuriousTerminal,
    GestureBegan,
    GestureChanged(f32),
    GestureEnded(GestureOutcome),
}

impl<P> ScheduleStep<P> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Push(..) => "push",
            Self::Pop(_) => "pop",
            Self::PopToRoot(_) => "pop_to_root",
            Self::PopTo(..) => "pop_to",
            Self::Cancel(_) => "cancel",
            Self::ClearPending => "clear_pending",
            Self::Deliver => "deliver",
            Self::SpuriousTerminal => "spurious_terminal",
            Self::GestureBegan => "gesture_began",
            Self::GestureChanged(_) => "gesture_changed",
            Self::GestureEnded(_) => "gesture_ended",
        }
    }
}

/// What happened during a schedule run.
#[derive(Debug, Clone)]
pub struct ScheduleReport<P> {
    /// Programmatic requests in submission order.
    pub submitted: Vec<RequestId>,
    /// Requests removed by `Cancel` steps.
    pub cancelled: Vec<RequestId>,
    /// Requests handed to the stack manager, in order.
    pub dispatched: Vec<(RequestId, Origin)>,
    /// Programmatic operations the simulator performed, in order.
    pub performed: Vec<Operation<P>>,
    /// Panels left on the stack.
    pub final_panels: Vec<P>,
    pub stats: SerializerStats,
    pub max_outstanding: usize,
    pub overlap_violations: usize,
    /// Whether the serializer ended idle with nothing pending.
    pub drained: bool,
    /// JSONL log lines.
    pub log: Vec<String>,
}

impl<P> ScheduleReport<P> {
    /// Dispatched ids strictly increase.
    #[must_use]
    pub fn dispatch_order_is_fifo(&self) -> bool {
        self.dispatched.windows(2).all(|w| w[0].0 < w[1].0)
    }

    /// No cancelled request ever reached the stack manager.
    #[must_use]
    pub fn no_cancelled_dispatch(&self) -> bool {
        self.dispatched
            .iter()
            .all(|(id, _)| !self.cancelled.contains(id))
    }

    /// The JSONL log as one string.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        self.log.join("\n")
    }
}

/// Run `steps` against a serializer whose stack starts as `[root]`.
pub fn run_schedule<P>(root: P, steps: &[ScheduleStep<P>], config: &NavConfig) -> ScheduleReport<P>
where
    P: Clone + PartialEq + fmt::Debug,
{
    let (sim, ctl) = SimulatedStackManager::manual(root.clone());
    let mut serializer = Serializer::with_config(sim, config);
    let mut report = ScheduleReport {
        submitted: Vec::new(),
        cancelled: Vec::new(),
        dispatched: Vec::new(),
        performed: Vec::new(),
        final_panels: Vec::new(),
        stats: SerializerStats::default(),
        max_outstanding: 0,
        overlap_violations: 0,
        drained: false,
        log: Vec::new(),
    };
    report.log.push(
        json!({"event": "schedule_start", "steps": steps.len(), "root": format!("{root:?}")})
            .to_string(),
    );

    let mut last_in_flight: Option<RequestId> = None;
    let mut record_dispatch = |serializer: &Serializer<P, SimulatedStackManager<P>>,
                               report: &mut ScheduleReport<P>| {
        let current = serializer.in_flight().map(|f| (f.id, f.descriptor.origin()));
        if let Some((id, origin)) = current
            && last_in_flight != Some(id)
        {
            report.dispatched.push((id, origin));
        }
        last_in_flight = current.map(|(id, _)| id);
    };

    for (idx, step) in steps.iter().enumerate() {
        match step {
            ScheduleStep::Push(panel, animated) => {
                let id = serializer.submit(TransitionDescriptor::push(panel.clone(), *animated));
                report.submitted.push(id);
            }
            ScheduleStep::Pop(animated) => {
                report
                    .submitted
                    .push(serializer.submit(TransitionDescriptor::pop(*animated)));
            }
            ScheduleStep::PopToRoot(animated) => {
                report
                    .submitted
                    .push(serializer.submit(TransitionDescriptor::pop_to_root(*animated)));
            }
            ScheduleStep::PopTo(panel, animated) => {
                let id = serializer.submit(TransitionDescriptor::pop_to(panel.clone(), *animated));
                report.submitted.push(id);
            }
            ScheduleStep::Cancel(n) => {
                if !report.submitted.is_empty() {
                    let id = report.submitted[n % report.submitted.len()];
                    if serializer.cancel_pending(id) {
                        report.cancelled.push(id);
                    }
                }
            }
            ScheduleStep::ClearPending => {
                let pending: Vec<RequestId> = serializer.pending().map(|r| r.id).collect();
                serializer.clear_pending();
                report.cancelled.extend(pending);
            }
            ScheduleStep::Deliver => {
                ctl.deliver_next(&mut serializer);
            }
            ScheduleStep::SpuriousTerminal => {
                if serializer.in_flight().is_none()
                    && let Some(top) = ctl.panels().last().cloned()
                {
                    serializer.handle_notification(Notification::did_show(top, Direction::Pop));
                }
            }
            ScheduleStep::GestureBegan => {
                serializer.gesture_began();
            }
            ScheduleStep::GestureChanged(progress) => serializer.gesture_changed(*progress),
            ScheduleStep::GestureEnded(outcome) => serializer.gesture_ended(*outcome),
        }
        record_dispatch(&serializer, &mut report);
        report.log.push(
            json!({
                "event": "step",
                "idx": idx,
                "step": step.name(),
                "state": serializer.state().as_str(),
                "pending": serializer.pending_len(),
            })
            .to_string(),
        );
    }

    for _ in 0..DRAIN_LIMIT {
        if serializer.gesture_progress().is_some() {
            serializer.gesture_ended(GestureOutcome::Completed);
        } else if !ctl.deliver_next(&mut serializer) {
            break;
        }
        record_dispatch(&serializer, &mut report);
    }

    report.performed = ctl.performed();
    report.final_panels = ctl.panels();
    report.stats = serializer.stats();
    report.max_outstanding = ctl.max_outstanding();
    report.overlap_violations = ctl.overlap_violations();
    report.drained = serializer.in_flight().is_none() && serializer.pending_len() == 0;
    report.log.push(
        json!({
            "event": "schedule_complete",
            "dispatched": report.dispatched.len(),
            "noops": report.stats.structural_noops,
            "cancelled": report.cancelled.len(),
            "overlaps": report.overlap_violations,
        })
        .to_string(),
    );
    tracing::debug!(
        target: "navseq.harness",
        steps = steps.len(),
        dispatched = report.dispatched.len(),
        overlaps = report.overlap_violations,
        "schedule complete"
    );
    report
}

// ============================================================================
// Storm generation
// ============================================================================

/// Simple deterministic PRNG (xorshift64) for reproducible schedules.
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    fn below(&mut self, max: u64) -> u64 {
        if max == 0 { 0 } else { self.next() % max }
    }

    fn flag(&mut self) -> bool {
        self.next() & 1 == 1
    }
}

/// Generate `count` steps mixing requests, completions, cancellation, and
/// gestures. Pushed panels are numbered from 1; panel 0 is the root.
#[must_use]
pub fn transition_storm(seed: u64, count: usize) -> Vec<ScheduleStep<u32>> {
    let mut rng = Rng::new(seed);
    let mut next_panel = 1u32;
    let mut steps = Vec::with_capacity(count);
    for _ in 0..count {
        let step = match rng.below(100) {
            0..=29 => {
                let panel = next_panel;
                next_panel += 1;
                ScheduleStep::Push(panel, rng.flag())
            }
            30..=44 => ScheduleStep::Pop(rng.flag()),
            45..=49 => ScheduleStep::PopToRoot(rng.flag()),
            50..=54 => {
                let panel = rng.below(u64::from(next_panel)) as u32;
                ScheduleStep::PopTo(panel, rng.flag())
            }
            55..=79 => ScheduleStep::Deliver,
            80..=83 => ScheduleStep::Cancel(rng.below(64) as usize),
            84 => ScheduleStep::ClearPending,
            85..=87 => ScheduleStep::SpuriousTerminal,
            88..=91 => ScheduleStep::GestureBegan,
            92..=95 => ScheduleStep::GestureChanged(rng.below(101) as f32 / 100.0),
            _ => ScheduleStep::GestureEnded(if rng.flag() {
                GestureOutcome::Completed
            } else {
                GestureOutcome::Cancelled
            }),
        };
        steps.push(step);
    }
    steps
}

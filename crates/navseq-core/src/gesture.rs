#![forbid(unsafe_code)]

//! Interactive pop: bridges a drag gesture into the completion-gate protocol.
//!
//! A drag that starts while nothing is in flight becomes an animated pop
//! request like any other, so queued requests wait for it. When the drag
//! ends, the serializer synthesizes the terminal notification itself.
//!
//! # Invariants
//!
//! 1. At most one session is active. A second `began` is a no-op.
//! 2. A session only starts when the serializer is idle, the queue is empty,
//!    and the stack is deep enough to pop. Otherwise the visible top would not
//!    match the panel the gesture started on.
//! 3. `Completed` and `Cancelled` both end the transition. The gate only
//!    tracks that a transition ended, not how it looked.

use crate::config::GestureConfig;
use crate::descriptor::RequestId;

/// How a drag gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureOutcome {
    /// The drag passed the threshold; the top panel is gone.
    Completed,
    /// The drag was released early; the top panel stays.
    Cancelled,
}

/// Why a `gesture_began` was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureRejection {
    /// Interactive pop is turned off in config.
    Disabled,
    /// A session is already active.
    SessionActive,
    /// A transition is in flight.
    InFlight,
    /// Requests are pending.
    QueueNotEmpty,
    /// The stack is shallower than `min_depth`.
    StackTooShallow,
}

impl GestureRejection {
    /// Stable snake_case label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::SessionActive => "session_active",
            Self::InFlight => "in_flight",
            Self::QueueNotEmpty => "queue_not_empty",
            Self::StackTooShallow => "stack_too_shallow",
        }
    }
}

/// A live drag session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveGesture {
    /// Latest progress in `0.0..=1.0`.
    pub progress: f32,
    /// The synthesized pop request this session drives.
    pub request: RequestId,
    /// Stack depth when the drag started.
    pub starting_depth: usize,
}

/// Session bookkeeping for interactive pops.
#[derive(Debug, Clone)]
pub struct InteractivePopAdapter {
    config: GestureConfig,
    session: Option<ActiveGesture>,
}

impl InteractivePopAdapter {
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Decide whether a drag may start.
    pub fn admit(
        &self,
        serializer_idle: bool,
        queue_empty: bool,
        depth: usize,
    ) -> Result<(), GestureRejection> {
        if !self.config.enabled {
            return Err(GestureRejection::Disabled);
        }
        if self.session.is_some() {
            return Err(GestureRejection::SessionActive);
        }
        if !serializer_idle {
            return Err(GestureRejection::InFlight);
        }
        if !queue_empty {
            return Err(GestureRejection::QueueNotEmpty);
        }
        if depth < self.config.min_depth {
            return Err(GestureRejection::StackTooShallow);
        }
        Ok(())
    }

    /// Open a session for `request`. Call only after [`admit`](Self::admit).
    pub fn begin(&mut self, request: RequestId, depth: usize) {
        debug_assert!(self.session.is_none(), "gesture session already active");
        self.session = Some(ActiveGesture {
            progress: 0.0,
            request,
            starting_depth: depth,
        });
        crate::debug!(
            target: "navseq.gesture",
            request = request.get(),
            depth,
            "interactive pop began"
        );
    }

    /// Record drag progress. Returns the clamped value, or `None` without a session.
    pub fn update(&mut self, progress: f32) -> Option<f32> {
        let session = self.session.as_mut()?;
        let clamped = if progress.is_nan() {
            session.progress
        } else {
            progress.clamp(0.0, 1.0)
        };
        session.progress = clamped;
        crate::trace!(target: "navseq.gesture", progress = clamped, "interactive pop progress");
        Some(clamped)
    }

    /// Close the session, returning it.
    pub fn end(&mut self) -> Option<ActiveGesture> {
        self.session.take()
    }

    #[must_use]
    pub fn session(&self) -> Option<&ActiveGesture> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }
}

impl Default for InteractivePopAdapter {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

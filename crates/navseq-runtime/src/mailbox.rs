#![forbid(unsafe_code)]

//! Command channel into the surface actor.
//!
//! A [`Mailbox`] exists before the stack manager does, so the stack manager
//! can be built holding a [`NotificationSink`]. Sending on the sink only
//! enqueues a command; it is therefore safe to report a notification from
//! inside `perform_transition` itself, and from any thread.

use std::fmt;
use std::sync::mpsc;

use navseq_core::{
    Direction, GestureOutcome, LifecycleObserver, Notification, TransitionDescriptor,
};

/// Caller-side handle for a submitted request, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub(crate) u64);

impl Ticket {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket#{}", self.0)
    }
}

/// Everything the actor can be asked to do, in arrival order.
pub(crate) enum Command<P> {
    Submit {
        ticket: Ticket,
        descriptor: TransitionDescriptor<P>,
    },
    Cancel(Ticket),
    ClearPending,
    Notify(Notification<P>),
    GestureBegan,
    GestureChanged(f32),
    GestureEnded(GestureOutcome),
    AddObserver(Box<dyn LifecycleObserver<P>>),
    Sync(mpsc::Sender<()>),
    Shutdown,
}

impl<P> Command<P> {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Cancel(_) => "cancel",
            Self::ClearPending => "clear_pending",
            Self::Notify(_) => "notify",
            Self::GestureBegan => "gesture_began",
            Self::GestureChanged(_) => "gesture_changed",
            Self::GestureEnded(_) => "gesture_ended",
            Self::AddObserver(_) => "add_observer",
            Self::Sync(_) => "sync",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Channel pair feeding one surface actor.
pub struct Mailbox<P> {
    pub(crate) sender: mpsc::Sender<Command<P>>,
    pub(crate) receiver: mpsc::Receiver<Command<P>>,
}

impl<P> Mailbox<P> {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// A sink for the stack manager to report lifecycle notifications.
    #[must_use]
    pub fn sink(&self) -> NotificationSink<P> {
        Self::sink_from(self.sender.clone())
    }

    pub(crate) fn sink_from(sender: mpsc::Sender<Command<P>>) -> NotificationSink<P> {
        NotificationSink { sender }
    }
}

impl<P> Default for Mailbox<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the stack manager reports `will_show` / `did_show`.
///
/// The surface actor must be the only consumer of these notifications.
/// Other listeners use [`NavigationSurface::add_observer`](crate::NavigationSurface::add_observer).
pub struct NotificationSink<P> {
    sender: mpsc::Sender<Command<P>>,
}

impl<P> Clone for NotificationSink<P> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<P> fmt::Debug for NotificationSink<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSink").finish_non_exhaustive()
    }
}

impl<P> NotificationSink<P> {
    /// `panel` is about to become the top.
    pub fn will_show(&self, panel: P, direction: Direction) {
        self.send(Notification::will_show(panel, direction));
    }

    /// `panel` became the top; the transition is complete.
    pub fn did_show(&self, panel: P, direction: Direction) {
        self.send(Notification::did_show(panel, direction));
    }

    /// Report a notification.
    ///
    /// Returns `false` if the surface has shut down; the notification is dropped.
    pub fn send(&self, notification: Notification<P>) -> bool {
        let delivered = self.sender.send(Command::Notify(notification)).is_ok();
        if !delivered {
            tracing::debug!(target: "navseq.surface", "surface closed; dropping notification");
        }
        delivered
    }
}

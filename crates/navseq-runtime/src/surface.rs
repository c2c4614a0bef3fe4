#![forbid(unsafe_code)]

//! Cloneable, thread-safe handle to a navigation surface.
//!
//! Every method sends a command to the actor and returns immediately; none
//! of them waits for a transition. The only blocking calls are
//! [`sync`](NavigationSurface::sync), a barrier for tests and diagnostics,
//! and [`shutdown`](NavigationSurface::shutdown).

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use arc_swap::ArcSwap;
use navseq_core::{
    ConfigError, GestureOutcome, LifecycleObserver, NavConfig, Serializer, StackManager,
    TransitionDescriptor,
};

use crate::actor::Actor;
use crate::mailbox::{Command, Mailbox, NotificationSink, Ticket};
use crate::snapshot::SurfaceSnapshot;

/// Errors from starting or stopping a surface.
#[derive(Debug)]
pub enum SurfaceError {
    /// The configuration did not validate.
    Config(ConfigError),
    /// The actor thread could not be spawned.
    Spawn(io::Error),
    /// The actor thread panicked (an internal invariant was violated).
    ActorPanicked(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid surface config: {e}"),
            Self::Spawn(e) => write!(f, "failed to spawn surface actor: {e}"),
            Self::ActorPanicked(msg) => write!(f, "surface actor panicked: {msg}"),
        }
    }
}

impl std::error::Error for SurfaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::ActorPanicked(_) => None,
        }
    }
}

struct Shared<P> {
    sender: mpsc::Sender<Command<P>>,
    snapshot: Arc<ArcSwap<SurfaceSnapshot>>,
    next_ticket: AtomicU64,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<P> Drop for Shared<P> {
    fn drop(&mut self) {
        // Don't join in drop to avoid blocking
        let _ = self.sender.send(Command::Shutdown);
    }
}

/// Caller-facing handle to one navigation stack.
///
/// Cloning is cheap; all clones talk to the same actor. The actor stops on
/// [`shutdown`](Self::shutdown) or when the last clone is dropped.
pub struct NavigationSurface<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for NavigationSurface<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P> fmt::Debug for NavigationSurface<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationSurface")
            .field("snapshot", &*self.shared.snapshot.load())
            .finish()
    }
}

impl<P> NavigationSurface<P>
where
    P: Clone + PartialEq + fmt::Debug + Send + 'static,
{
    /// Start the actor thread that owns the serializer.
    ///
    /// `stack` should already hold a sink from `mailbox`.
    pub fn spawn<S>(mailbox: Mailbox<P>, stack: S, config: &NavConfig) -> Result<Self, SurfaceError>
    where
        S: StackManager<P> + Send + 'static,
    {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(SurfaceError::Config(ConfigError::Validation(errors)));
        }

        let Mailbox { sender, receiver } = mailbox;
        let snapshot = Arc::new(ArcSwap::from_pointee(SurfaceSnapshot::default()));
        let actor = Actor::new(
            Serializer::with_config(stack, config),
            receiver,
            Arc::clone(&snapshot),
        );
        let worker = thread::Builder::new()
            .name(config.surface.thread_name.clone())
            .spawn(move || actor.run())
            .map_err(SurfaceError::Spawn)?;

        tracing::debug!(
            target: "navseq.surface",
            thread = %config.surface.thread_name,
            "surface spawned"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                sender,
                snapshot,
                next_ticket: AtomicU64::new(1),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }
}

impl<P> NavigationSurface<P> {
    fn send(&self, command: Command<P>) -> bool {
        let label = command.label();
        let sent = self.shared.sender.send(command).is_ok();
        if !sent {
            tracing::debug!(target: "navseq.surface", command = label, "surface closed; dropping command");
        }
        sent
    }

    /// Push `panel`. Fire-and-forget.
    pub fn request_push(&self, panel: P, animated: bool) {
        self.submit(TransitionDescriptor::push(panel, animated));
    }

    /// Pop the top panel. Fire-and-forget; a pop with nothing to pop is a no-op.
    pub fn request_pop(&self, animated: bool) {
        self.submit(TransitionDescriptor::pop(animated));
    }

    /// Pop everything above the root. Fire-and-forget.
    pub fn request_pop_to_root(&self, animated: bool) {
        self.submit(TransitionDescriptor::pop_to_root(animated));
    }

    /// Pop until `panel` is the top. Fire-and-forget.
    pub fn request_pop_to(&self, panel: P, animated: bool) {
        self.submit(TransitionDescriptor::pop_to(panel, animated));
    }

    /// Submit a descriptor, returning a ticket usable with [`cancel`](Self::cancel).
    pub fn submit(&self, descriptor: TransitionDescriptor<P>) -> Ticket {
        let ticket = Ticket(self.shared.next_ticket.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Submit { ticket, descriptor });
        ticket
    }

    /// Cancel a request that has not started yet. Has no effect on a
    /// request that is in flight or finished.
    pub fn cancel(&self, ticket: Ticket) {
        self.send(Command::Cancel(ticket));
    }

    /// Cancel every request that has not started yet.
    pub fn clear_pending(&self) {
        self.send(Command::ClearPending);
    }

    pub fn gesture_began(&self) {
        self.send(Command::GestureBegan);
    }

    pub fn gesture_changed(&self, progress: f32) {
        self.send(Command::GestureChanged(progress));
    }

    pub fn gesture_ended(&self, outcome: GestureOutcome) {
        self.send(Command::GestureEnded(outcome));
    }

    /// Register a secondary listener for lifecycle notifications.
    pub fn add_observer(&self, observer: impl LifecycleObserver<P> + 'static) {
        self.send(Command::AddObserver(Box::new(observer)));
    }

    /// Another sink for lifecycle notifications, for stack managers created late.
    #[must_use]
    pub fn notification_sink(&self) -> NotificationSink<P> {
        Mailbox::sink_from(self.shared.sender.clone())
    }

    /// Latest published state. Never blocks.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SurfaceSnapshot> {
        self.shared.snapshot.load_full()
    }

    /// Block until every command sent before this call has been applied.
    ///
    /// Returns `false` if the actor has stopped.
    pub fn sync(&self) -> bool {
        let (reply, wait) = mpsc::channel();
        if !self.send(Command::Sync(reply)) {
            return false;
        }
        wait.recv().is_ok()
    }

    /// Stop the actor and wait for it to exit.
    ///
    /// Pending requests are dropped. Later calls on any clone are no-ops.
    pub fn shutdown(&self) -> Result<(), SurfaceError> {
        self.send(Command::Shutdown);
        let worker = self
            .shared
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(worker) = worker else {
            return Ok(());
        };
        worker.join().map_err(|payload| {
            let message = payload
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_string()))
                .unwrap_or_else(|| "unknown panic".into());
            tracing::error!(target: "navseq.surface", %message, "surface actor panicked");
            SurfaceError::ActorPanicked(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navseq_core::{Direction, Operation, SerializerState};

    /// Applies every transition at once and reports it through the sink.
    struct Echo {
        panels: Vec<u8>,
        sink: NotificationSink<u8>,
        log: Arc<Mutex<Vec<Operation<u8>>>>,
    }

    impl StackManager<u8> for Echo {
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
            match operation {
                Operation::Push(p) => self.panels.push(*p),
                Operation::Pop => {
                    self.panels.pop();
                }
                Operation::PopToRoot => self.panels.truncate(1),
                Operation::PopTo(p) => {
                    if let Some(i) = self.panels.iter().position(|x| x == p) {
                        self.panels.truncate(i + 1);
                    }
                }
            }
            self.log.lock().unwrap().push(operation.clone());
            if let Some(top) = self.top() {
                self.sink.did_show(top, operation.direction());
            }
        }
    }

    fn echo_surface() -> (NavigationSurface<u8>, Arc<Mutex<Vec<Operation<u8>>>>) {
        let mailbox = Mailbox::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = Echo {
            panels: vec![0],
            sink: mailbox.sink(),
            log: Arc::clone(&log),
        };
        let surface = NavigationSurface::spawn(mailbox, stack, &NavConfig::default()).unwrap();
        (surface, log)
    }

    /// Each barrier lets at least one reported completion through.
    fn settle(surface: &NavigationSurface<u8>) {
        for _ in 0..16 {
            assert!(surface.sync());
            if surface.snapshot().is_quiescent() {
                return;
            }
        }
        panic!("surface did not settle: {:?}", surface.snapshot());
    }

    #[test]
    fn requests_drain_in_order() {
        let (surface, log) = echo_surface();
        surface.request_push(1, true);
        surface.request_push(2, false);
        surface.request_pop(true);
        settle(&surface);
        assert_eq!(
            *log.lock().unwrap(),
            vec![Operation::Push(1), Operation::Push(2), Operation::Pop]
        );
        let snap = surface.snapshot();
        assert_eq!(snap.state, SerializerState::Idle);
        assert_eq!(snap.stats.resolved, 3);
        surface.shutdown().unwrap();
    }

    #[test]
    fn pop_on_root_is_noop() {
        let (surface, log) = echo_surface();
        surface.request_pop(true);
        surface.request_pop_to_root(true);
        assert!(surface.sync());
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(surface.snapshot().stats.structural_noops, 2);
        surface.shutdown().unwrap();
    }

    #[test]
    fn shutdown_closes_snapshot_and_is_idempotent() {
        let (surface, _log) = echo_surface();
        let other = surface.clone();
        surface.shutdown().unwrap();
        assert!(surface.snapshot().closed);
        assert!(!other.sync());
        other.shutdown().unwrap();
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mailbox = Mailbox::new();
        let mut config = NavConfig::default();
        config.gesture.min_depth = 0;
        let stack = Echo {
            panels: vec![0],
            sink: mailbox.sink(),
            log: Arc::default(),
        };
        let err = NavigationSurface::spawn(mailbox, stack, &config).unwrap_err();
        assert!(matches!(err, SurfaceError::Config(_)));
    }

    #[test]
    fn external_sink_reaches_actor() {
        let (surface, _log) = echo_surface();
        let sink = surface.notification_sink();
        assert!(sink.send(navseq_core::Notification::did_show(0, Direction::Pop)));
        assert!(surface.sync());
        assert_eq!(surface.snapshot().stats.ignored_notifications, 1);
        surface.shutdown().unwrap();
    }
}

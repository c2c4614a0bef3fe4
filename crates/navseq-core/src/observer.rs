#![forbid(unsafe_code)]

//! Secondary listeners for lifecycle notifications.
//!
//! The serializer is the exclusive consumer of the stack manager's
//! notifications. Anything else that needs to know when panels appear
//! registers an observer here; observers see every notification after the
//! completion gate has processed it and cannot intercept or suppress it.

use crate::notification::Notification;

/// Receives forwarded lifecycle notifications.
pub trait LifecycleObserver<P>: Send {
    fn on_notification(&mut self, notification: &Notification<P>);
}

impl<P, F> LifecycleObserver<P> for F
where
    F: FnMut(&Notification<P>) + Send,
{
    fn on_notification(&mut self, notification: &Notification<P>) {
        self(notification);
    }
}

/// Handle returned by registration, used to remove an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub(crate) struct ObserverList<P> {
    entries: Vec<(ObserverId, Box<dyn LifecycleObserver<P>>)>,
    next_id: u64,
}

impl<P> ObserverList<P> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub(crate) fn add(&mut self, observer: Box<dyn LifecycleObserver<P>>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, notification: &Notification<P>) {
        for (_, observer) in &mut self.entries {
            observer.on_notification(notification);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<P> std::fmt::Debug for ObserverList<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.len())
            .finish()
    }
}

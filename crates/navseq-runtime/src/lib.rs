#![forbid(unsafe_code)]

//! navseq Runtime
//!
//! Hosts a [`Serializer`](navseq_core::Serializer) on a dedicated actor
//! thread so that any number of producers, the stack manager's notification
//! path, and the gesture input path all funnel through one serialization
//! point.
//!
//! # Key Components
//!
//! - [`Mailbox`] - Command channel created before the stack manager
//! - [`NotificationSink`] - Handle the stack manager uses to report lifecycle events
//! - [`NavigationSurface`] - Cloneable, fire-and-forget caller handle
//! - [`SurfaceSnapshot`] - Lock-free view of serializer state
//!
//! # Wiring
//!
//! ```rust,ignore
//! let mailbox = Mailbox::new();
//! let stack = MyStack::new(mailbox.sink());
//! let surface = NavigationSurface::spawn(mailbox, stack, &NavConfig::default())?;
//!
//! surface.request_push(settings, false);
//! surface.request_push(detail, true); // waits for the first push to finish
//! ```
//!
//! The serializer is passed to the stack manager as its notification sink at
//! construction; there is no global registry.

pub mod mailbox;
pub mod snapshot;
pub mod surface;

mod actor;

pub use mailbox::{Mailbox, NotificationSink, Ticket};
pub use snapshot::SurfaceSnapshot;
pub use surface::{NavigationSurface, SurfaceError};

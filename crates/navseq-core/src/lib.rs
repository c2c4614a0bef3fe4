#![forbid(unsafe_code)]

//! Core: single-flight serialization of navigation stack transitions.
//!
//! # Role in navseq
//! `navseq-core` holds the sans-IO state machines. Callers enqueue push/pop
//! requests back-to-back; the [`Serializer`] hands them to the underlying
//! [`StackManager`] one at a time, waiting for each transition's terminal
//! lifecycle notification before releasing the next.
//!
//! # Primary responsibilities
//! - **TransitionDescriptor**: one requested push/pop and its animation flag.
//! - **RequestQueue**: FIFO of descriptors that have not started yet.
//! - **CompletionGate**: tracks the single in-flight transition.
//! - **Serializer**: drains the queue whenever the gate is idle.
//! - **InteractivePopAdapter**: maps a drag gesture onto the same gate protocol.
//!
//! # How it fits in the system
//! Every type here is single-threaded and driven through `&mut self`.
//! `navseq-runtime` wraps the [`Serializer`] in an actor thread so multiple
//! producers and the rendering side can share one serialization point.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod gate;
pub mod gesture;
pub mod logging;
pub mod notification;
pub mod observer;
pub mod queue;
pub mod serializer;
pub mod stack;

pub use config::{GestureConfig, NavConfig, QueueConfig, SurfaceConfig};
pub use descriptor::{Direction, Operation, OperationKind, Origin, RequestId, TransitionDescriptor};
pub use error::{AlreadyArmedError, ConfigError};
pub use gate::{ArmedTransition, CompletionGate, GateState, Observation};
pub use gesture::{ActiveGesture, GestureOutcome, GestureRejection, InteractivePopAdapter};
pub use notification::{Notification, Phase};
pub use observer::{LifecycleObserver, ObserverId};
pub use queue::{QueuedRequest, RequestQueue};
pub use serializer::{InFlight, Serializer, SerializerState, SerializerStats};
pub use stack::{Feasibility, StackManager, classify};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

#![forbid(unsafe_code)]

//! Transition descriptors: the leaf value describing one requested operation.
//!
//! A [`TransitionDescriptor`] is immutable once built. The request queue owns
//! it until the serializer dequeues it; the serializer then owns it for as
//! long as the transition is in flight.

use std::fmt;

/// Which way a transition moves the top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// A new panel becomes the top.
    Push,
    /// One or more panels are removed from the top.
    Pop,
}

impl Direction {
    /// Stable lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pop => "pop",
        }
    }
}

/// A requested stack operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation<P> {
    /// Push `P` on top of the stack.
    Push(P),
    /// Remove the top panel.
    Pop,
    /// Remove every panel above the root.
    PopToRoot,
    /// Remove panels until `P` is the top.
    PopTo(P),
}

impl<P> Operation<P> {
    /// Direction of the resulting transition.
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Self::Push(_) => Direction::Push,
            Self::Pop | Self::PopToRoot | Self::PopTo(_) => Direction::Pop,
        }
    }

    /// Panel-free discriminant, used by the completion gate and in logs.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Push(_) => OperationKind::Push,
            Self::Pop => OperationKind::Pop,
            Self::PopToRoot => OperationKind::PopToRoot,
            Self::PopTo(_) => OperationKind::PopTo,
        }
    }

    /// The panel named by the operation, if any.
    #[must_use]
    pub fn panel(&self) -> Option<&P> {
        match self {
            Self::Push(panel) | Self::PopTo(panel) => Some(panel),
            Self::Pop | Self::PopToRoot => None,
        }
    }
}

/// Panel-free form of [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Push,
    Pop,
    PopToRoot,
    PopTo,
}

impl OperationKind {
    /// Direction of transitions of this kind.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Push => Direction::Push,
            Self::Pop | Self::PopToRoot | Self::PopTo => Direction::Pop,
        }
    }

    /// Stable snake_case label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pop => "pop",
            Self::PopToRoot => "pop_to_root",
            Self::PopTo => "pop_to",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// Requested through the caller-facing API.
    #[default]
    Programmatic,
    /// Synthesized by the interactive-pop gesture adapter.
    Interactive,
}

/// One requested transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDescriptor<P> {
    operation: Operation<P>,
    animated: bool,
    origin: Origin,
}

impl<P> TransitionDescriptor<P> {
    /// Build a programmatic descriptor.
    #[must_use]
    pub fn new(operation: Operation<P>, animated: bool) -> Self {
        Self {
            operation,
            animated,
            origin: Origin::Programmatic,
        }
    }

    /// Push `panel`.
    #[must_use]
    pub fn push(panel: P, animated: bool) -> Self {
        Self::new(Operation::Push(panel), animated)
    }

    /// Pop the top panel.
    #[must_use]
    pub fn pop(animated: bool) -> Self {
        Self::new(Operation::Pop, animated)
    }

    /// Pop everything above the root panel.
    #[must_use]
    pub fn pop_to_root(animated: bool) -> Self {
        Self::new(Operation::PopToRoot, animated)
    }

    /// Pop until `panel` is the top.
    #[must_use]
    pub fn pop_to(panel: P, animated: bool) -> Self {
        Self::new(Operation::PopTo(panel), animated)
    }

    /// Animated pop driven by an interactive gesture.
    pub(crate) fn interactive_pop() -> Self {
        Self {
            operation: Operation::Pop,
            animated: true,
            origin: Origin::Interactive,
        }
    }

    #[must_use]
    pub fn operation(&self) -> &Operation<P> {
        &self.operation
    }

    #[must_use]
    pub fn animated(&self) -> bool {
        self.animated
    }

    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.operation.direction()
    }
}

/// Identifier assigned to each descriptor when it is enqueued.
///
/// Ids are monotonically increasing per queue, so they also record
/// submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

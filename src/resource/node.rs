//! Untyped program nodes.
//!
//! [`Resource`](crate::resource::Resource) programs are trees of [`Node`]s.
//! Intermediate values are type-erased with [`std::any::Any`] so a chain of
//! binds with different intermediate types collapses into a single node
//! type, which is what lets the interpreter run as a flat loop instead of
//! recursing through the tree. Every erasure site is paired with a typed
//! downcast at construction time, so a failed downcast is a bug in this
//! module, never in caller code.

use std::any::Any;

use crate::effect::Effect;
use crate::exit::ExitCase;

/// A type-erased intermediate value flowing between program steps.
pub(crate) type AnyValue = Box<dyn Any + Send>;

/// A pending cleanup action for one acquired value.
pub(crate) type Finalizer<E> = Box<dyn FnOnce(ExitCase<E>) -> Effect<(), E> + Send>;

/// One step of a resource program.
pub(crate) enum Node<E> {
    /// Acquire a value and register its finalizer.
    Allocate(Effect<(AnyValue, Finalizer<E>), E>),
    /// Run `source`, then feed its result to `cont`.
    Bind {
        source: Box<Node<E>>,
        cont: Box<dyn FnOnce(AnyValue) -> Node<E> + Send>,
    },
    /// Defer to an effect that produces the next node.
    Suspend(Effect<Node<E>, E>),
}

impl<E> Node<E> {
    /// Node kind label, for `Debug` output.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Allocate(_) => "allocate",
            Node::Bind { .. } => "bind",
            Node::Suspend(_) => "suspend",
        }
    }
}

impl<E> Node<E>
where
    E: Send + 'static,
{
    /// A node that yields `value` with no cleanup.
    pub(crate) fn pure_value<A: Send + 'static>(value: A) -> Self {
        Node::Allocate(Effect::pure((erase(value), noop_finalizer())))
    }
}

/// A finalizer that does nothing, for values with no cleanup.
pub(crate) fn noop_finalizer<E: Send + 'static>() -> Finalizer<E> {
    Box::new(|_exit| Effect::unit())
}

/// Erase a typed value for transport between nodes.
pub(crate) fn erase<A: Send + 'static>(value: A) -> AnyValue {
    Box::new(value)
}

/// Recover the typed value at a construction site.
///
/// The expected type is fixed by the constructor that erased the value, so
/// a mismatch here is an internal invariant violation.
pub(crate) fn downcast_value<A: Send + 'static>(value: AnyValue) -> A {
    *value.downcast::<A>().unwrap_or_else(|_| {
        panic!(
            "intermediate value was not a {}",
            std::any::type_name::<A>()
        )
    })
}

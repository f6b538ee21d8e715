//! Scoped acquisition with guaranteed release.
//!
//! A [`Resource`] is a description of how to acquire a value, paired with
//! how to release it. Composing resources nests their lifetimes: in
//! `a.flat_map(|_| b)`, `b` is acquired after `a` and released before it,
//! so release always runs in reverse acquisition order no matter how the
//! program exits.
//!
//! Building a `Resource` performs no work. Acquisition happens when the
//! program is interpreted by [`Resource::use_with`] (run a closure against
//! the value, then tear everything down) or [`Resource::allocated`] (hand
//! the caller the value plus an explicit release handle).
//!
//! # Example
//!
//! ```rust,ignore
//! let pool = Resource::make(open_pool(), |pool| close_pool(pool));
//! let listener = Resource::make(bind_listener(), |l| shutdown(l));
//!
//! let server = pool.flat_map(|p| listener.map(move |l| (p.clone(), l)));
//!
//! // Both released in reverse order after `serve` finishes, even on error.
//! server.use_with(|(pool, listener)| serve(pool, listener));
//! ```

mod fold;
mod node;
mod recover;
mod tail_rec;

use std::fmt;
use std::marker::PhantomData;

use crate::effect::Effect;
use crate::exit::ExitCase;

use node::{downcast_value, erase, Node};

pub(crate) use node::{AnyValue, Finalizer};

/// A program that acquires an `A` and guarantees its release.
pub struct Resource<A, E> {
    pub(crate) node: Node<E>,
    _marker: PhantomData<fn() -> A>,
}

impl<A, E> fmt::Debug for Resource<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(&self.node.kind()).finish()
    }
}

impl<A, E> Resource<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn from_node(node: Node<E>) -> Self {
        Resource {
            node,
            _marker: PhantomData,
        }
    }

    /// A resource that yields `value` with no cleanup.
    pub fn pure(value: A) -> Self {
        Resource::from_node(Node::pure_value(value))
    }

    /// Rewrap an already-acquired value and its pending finalizer.
    pub(crate) fn from_allocated(value: A, finalizer: Finalizer<E>) -> Self {
        Resource::from_node(Node::Allocate(Effect::pure((erase(value), finalizer))))
    }

    /// Lift an effect into a resource with no cleanup.
    ///
    /// The lifted effect runs at the interpreter's cancelability, so a
    /// long-running lifted effect remains interruptible.
    pub fn lift(effect: Effect<A, E>) -> Self {
        Resource::suspend(effect.map(Resource::pure))
    }

    /// Defer to an effect that decides what resource to build.
    pub fn suspend(effect: Effect<Resource<A, E>, E>) -> Self {
        Resource::from_node(Node::Suspend(effect.map(|r| r.node)))
    }

    /// A resource that cancels its own scope instead of yielding.
    pub fn canceled() -> Self {
        Resource::lift(Effect::canceled())
    }

    /// A resource that never yields.
    ///
    /// Parks until the surrounding scope is canceled; anything acquired
    /// before it still releases.
    pub fn never() -> Self {
        Resource::lift(Effect::never())
    }

    /// Sequence a dependent resource after this one.
    ///
    /// The second resource's lifetime nests inside the first: acquired
    /// after, released before.
    pub fn flat_map<B, F>(self, f: F) -> Resource<B, E>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Resource<B, E> + Send + 'static,
    {
        Resource::from_node(Node::Bind {
            source: Box::new(self.node),
            cont: Box::new(move |value| f(downcast_value::<A>(value)).node),
        })
    }

    /// Transform the yielded value without touching acquisition or release.
    pub fn map<B, F>(self, f: F) -> Resource<B, E>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.flat_map(move |a| Resource::pure(f(a)))
    }
}

impl<A, E> Resource<A, E>
where
    A: Clone + Send + 'static,
    E: Send + 'static,
{
    /// Pair an acquisition effect with its release action.
    ///
    /// Exit-blind variant of [`Resource::make_case`].
    pub fn make<R>(acquire: Effect<A, E>, release: R) -> Self
    where
        R: FnOnce(A) -> Effect<(), E> + Send + 'static,
    {
        Resource::make_case(acquire, move |a, _exit| release(a))
    }

    /// Pair an acquisition effect with an exit-aware release action.
    ///
    /// Acquisition runs masked once started, so it either never begins or
    /// completes with its finalizer registered. Release runs masked with
    /// the [`ExitCase`] describing how the surrounding program ended.
    ///
    /// The value must be `Clone`: one copy is yielded downstream, the
    /// original is owned by the finalizer. Wrap non-clonable handles in
    /// `Arc`.
    pub fn make_case<R>(acquire: Effect<A, E>, release: R) -> Self
    where
        R: FnOnce(A, ExitCase<E>) -> Effect<(), E> + Send + 'static,
    {
        Resource::from_node(Node::Allocate(acquire.map(move |a| {
            let retained = a.clone();
            let finalizer: Finalizer<E> = Box::new(move |exit| release(retained, exit));
            (erase(a), finalizer)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_a_resource_runs_nothing() {
        let _resource = Resource::<i32, String>::make(
            Effect::from_fn(|| panic!("acquire must be lazy")),
            |_| Effect::from_fn(|| panic!("release must be lazy")),
        );
    }

    #[test]
    fn debug_shows_the_node_kind() {
        let pure = Resource::<i32, String>::pure(1);
        assert_eq!(format!("{:?}", pure), "Resource(\"allocate\")");

        let bound = Resource::<i32, String>::pure(1).flat_map(Resource::pure);
        assert_eq!(format!("{:?}", bound), "Resource(\"bind\")");
    }
}

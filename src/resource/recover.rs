//! Error recovery over resource programs.
//!
//! [`Resource::attempt`] rewrites the program tree so every step surfaces
//! its error as a value instead of short-circuiting. Finalizers registered
//! before a failing step stay registered: recovery keeps the surrounding
//! scope alive, so those releases run when the overall scope ends, not at
//! the failure point.

use crate::resource::node::{downcast_value, erase, noop_finalizer, Node};
use crate::resource::Resource;

/// A step result with the error channel reified, erased for transport.
enum Attempted<E> {
    Ok(crate::resource::AnyValue),
    Err(E),
}

/// Rewrite `node` so it always completes, yielding an erased
/// [`Attempted`] instead of raising.
///
/// Cancellation is not an error and still short-circuits the rewritten
/// program.
fn attempt_node<E>(node: Node<E>) -> Node<E>
where
    E: Send + 'static,
{
    match node {
        Node::Allocate(effect) => Node::Allocate(effect.attempt().map(|step| match step {
            Ok((value, finalizer)) => (erase::<Attempted<E>>(Attempted::Ok(value)), finalizer),
            Err(e) => (erase::<Attempted<E>>(Attempted::Err(e)), noop_finalizer()),
        })),
        Node::Bind { source, cont } => Node::Bind {
            source: Box::new(attempt_node(*source)),
            cont: Box::new(move |value| match downcast_value::<Attempted<E>>(value) {
                Attempted::Ok(value) => attempt_node(cont(value)),
                Attempted::Err(e) => Node::pure_value(Attempted::<E>::Err(e)),
            }),
        },
        Node::Suspend(effect) => Node::Suspend(effect.attempt().map(|step| match step {
            Ok(next) => attempt_node(next),
            Err(e) => Node::pure_value(Attempted::<E>::Err(e)),
        })),
    }
}

impl<A, E> Resource<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Surface the error channel as a value.
    ///
    /// A raised error anywhere in the program becomes an `Err` result;
    /// finalizers registered before the failure remain scoped to the
    /// overall program. Cancellation passes through unchanged.
    pub fn attempt(self) -> Resource<Result<A, E>, E> {
        Resource::from_node(Node::Bind {
            source: Box::new(attempt_node(self.node)),
            cont: Box::new(|value| match downcast_value::<Attempted<E>>(value) {
                Attempted::Ok(value) => {
                    Node::pure_value(Ok::<A, E>(downcast_value::<A>(value)))
                }
                Attempted::Err(e) => Node::pure_value(Err::<A, E>(e)),
            }),
        })
    }

    /// Recover from a raised error with a fallback resource.
    pub fn handle_error_with<F>(self, f: F) -> Self
    where
        F: FnOnce(E) -> Resource<A, E> + Send + 'static,
    {
        self.attempt().flat_map(move |step| match step {
            Ok(value) => Resource::pure(value),
            Err(e) => f(e),
        })
    }
}

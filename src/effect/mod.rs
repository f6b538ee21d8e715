//! The boxed effect value and its operation surface.
//!
//! An [`Effect<A, E>`] describes a computation that, when run inside a
//! [`CancelScope`], completes with an [`Outcome<A, E>`]: a value, an error,
//! or cancellation. Until [`Effect::run`] is awaited nothing happens: an
//! effect is a description, cheap to build and compose.
//!
//! # Representation
//!
//! An effect is a one-shot boxed closure from a scope to a boxed future.
//! Boxing keeps the type simple and makes recursive and heterogeneous
//! composition possible; the cost is one allocation per combinator, which is
//! the right trade for a resource-management layer that sits around I/O.
//!
//! # Cancellation
//!
//! [`Effect::run`] checks the scope once at entry, so every effect boundary
//! is a poll point: a composition observes a cancellation request at the
//! next boundary and completes with [`Outcome::Canceled`]. Masking
//! ([`Effect::uncancelable`]) makes a region ignore the request until one of
//! its [`Poll`] points is reached.
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice::prelude::*;
//!
//! let effect = Effect::<i32, String>::pure(21)
//!     .map(|n| n * 2)
//!     .and_then(|n| Effect::pure(n + 1));
//!
//! let outcome = effect.run(CancelScope::root()).await;
//! assert_eq!(outcome, Outcome::Completed(43));
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::cancel::CancelScope;
use crate::exit::Outcome;

mod combinators;
mod constructors;
mod mask;

pub use mask::Poll;

pub(crate) use combinators::settle;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A one-shot, cancellable, composable effectful computation.
///
/// `A` is the success type, `E` the opaque error type. See the
/// [module docs](self) for the execution model.
pub struct Effect<A, E> {
    #[allow(clippy::type_complexity)]
    run_fn: Box<dyn FnOnce(CancelScope) -> BoxFuture<'static, Outcome<A, E>> + Send>,
}

impl<A, E> std::fmt::Debug for Effect<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect").field("run_fn", &"<effect>").finish()
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Build an effect from a closure producing the future to run.
    ///
    /// The crate-internal constructor every combinator goes through. The
    /// closure receives the scope the effect runs in; cancellation has
    /// already been checked by [`Effect::run`] when it is invoked.
    pub(crate) fn from_run<F>(f: F) -> Self
    where
        F: FnOnce(CancelScope) -> BoxFuture<'static, Outcome<A, E>> + Send + 'static,
    {
        Effect { run_fn: Box::new(f) }
    }

    /// Run this effect inside the given scope.
    ///
    /// Checks the scope for an observable cancellation request first; a
    /// canceled effect never starts its underlying computation.
    pub fn run(self, scope: CancelScope) -> BoxFuture<'static, Outcome<A, E>> {
        Box::pin(async move {
            if scope.cancel_requested() {
                return Outcome::Canceled;
            }
            (self.run_fn)(scope).await
        })
    }
}

/// Report a finalizer error that is being discarded because an earlier
/// outcome takes precedence.
pub(crate) fn report_discarded<E: std::fmt::Debug>(err: &E) {
    #[cfg(feature = "tracing")]
    tracing::warn!("resource cleanup failed: {:?}", err);
    #[cfg(not(feature = "tracing"))]
    eprintln!("resource cleanup failed: {:?}", err);
}

//! The resource interpreter.
//!
//! Programs are interpreted by a single flat loop holding explicit stacks
//! for pending continuations and registered finalizers. Nothing recurses
//! over the program tree, so arbitrarily long bind chains run in
//! constant stack space, including the ones [`Resource::tail_rec_m`] builds.

use std::fmt::Debug;

use crate::cancel::CancelScope;
use crate::effect::{report_discarded, settle, Effect};
use crate::exit::{ExitCase, Outcome};
use crate::resource::node::{downcast_value, AnyValue, Finalizer, Node};
use crate::resource::Resource;

/// What a fully interpreted build phase produced: the final value (or how
/// the build stopped), plus every finalizer registered along the way.
type Built<E> = (Outcome<AnyValue, E>, Vec<Finalizer<E>>);

/// Run the build phase of a program.
///
/// Returns the finalizers in acquisition order; callers release them in
/// reverse. Cancellation is checked before each acquisition, and each
/// acquisition then runs masked, so an acquire either never starts or
/// completes with its finalizer registered.
async fn build<E>(root: Node<E>, scope: CancelScope) -> Built<E>
where
    E: Send + 'static,
{
    let mut node = root;
    let mut conts: Vec<Box<dyn FnOnce(AnyValue) -> Node<E> + Send>> = Vec::new();
    let mut finalizers: Vec<Finalizer<E>> = Vec::new();

    loop {
        match node {
            Node::Bind { source, cont } => {
                conts.push(cont);
                node = *source;
            }
            Node::Suspend(effect) => match effect.run(scope.clone()).await {
                Outcome::Completed(next) => node = next,
                Outcome::Errored(e) => return (Outcome::Errored(e), finalizers),
                Outcome::Canceled => return (Outcome::Canceled, finalizers),
            },
            Node::Allocate(effect) => {
                if scope.cancel_requested() {
                    return (Outcome::Canceled, finalizers);
                }
                match effect.run(scope.mask()).await {
                    Outcome::Completed((value, finalizer)) => {
                        finalizers.push(finalizer);
                        match conts.pop() {
                            Some(cont) => node = cont(value),
                            None => return (Outcome::Completed(value), finalizers),
                        }
                    }
                    Outcome::Errored(e) => return (Outcome::Errored(e), finalizers),
                    Outcome::Canceled => return (Outcome::Canceled, finalizers),
                }
            }
        }
    }
}

/// Release finalizers in reverse acquisition order.
///
/// Every finalizer runs masked, regardless of earlier failures. Returns
/// the first error raised; later release errors are logged and discarded.
pub(crate) async fn release_all<E>(
    finalizers: Vec<Finalizer<E>>,
    exit: ExitCase<E>,
    scope: CancelScope,
) -> Option<E>
where
    E: Clone + Debug + Send + 'static,
{
    let mut first_error = None;
    for finalizer in finalizers.into_iter().rev() {
        if let Outcome::Errored(e) = finalizer(exit.clone()).run(scope.mask()).await {
            if first_error.is_none() {
                first_error = Some(e);
            } else {
                report_discarded(&e);
            }
        }
    }
    first_error
}

impl<A, E> Resource<A, E>
where
    A: Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    /// Acquire the value, run `f` against it, then release everything.
    ///
    /// Release runs on every exit path (success, error, or cancellation)
    /// in reverse acquisition order, with each finalizer seeing the
    /// [`ExitCase`] of the overall run. If the run succeeded and a
    /// finalizer raises, that error becomes the result; otherwise the
    /// primary outcome wins and release errors are logged.
    pub fn use_with<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Effect<B, E> + Send + 'static,
    {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                let (built, finalizers) = build(self.node, scope.clone()).await;
                let outcome = match built {
                    Outcome::Completed(value) => {
                        f(downcast_value::<A>(value)).run(scope.clone()).await
                    }
                    Outcome::Errored(e) => Outcome::Errored(e),
                    Outcome::Canceled => Outcome::Canceled,
                };
                let exit = outcome.exit_case();
                match release_all(finalizers, exit, scope).await {
                    None => outcome,
                    Some(error) => settle(outcome, Outcome::Errored(error)),
                }
            })
        })
    }

    /// Acquire the value and immediately release everything.
    ///
    /// Useful when the program is run for its acquisition effects and the
    /// value itself matters more than holding it open.
    pub fn used(self) -> Effect<A, E> {
        self.use_with(Effect::pure)
    }

    /// Acquire the value and hand back an explicit release handle.
    ///
    /// The resource's scoping guarantee transfers to the caller: the
    /// returned effect must be run exactly once to release everything the
    /// acquisition registered, and dropping it without running it leaks
    /// that cleanup. If the build itself fails or is canceled, partially
    /// acquired state is unwound before this effect resolves.
    pub fn allocated(self) -> Effect<(A, Effect<(), E>), E> {
        self.allocated_case().map(|(value, finalizer)| {
            let release =
                Effect::from_run(move |scope| finalizer(ExitCase::Completed).run(scope.mask()));
            (value, release)
        })
    }

    /// Like [`Resource::allocated`], but the release handle still accepts
    /// an exit case, so the caller can forward how the surrounding
    /// computation ended.
    pub(crate) fn allocated_case(self) -> Effect<(A, Finalizer<E>), E> {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                let (built, finalizers) = build(self.node, scope.clone()).await;
                match built {
                    Outcome::Completed(value) => {
                        let release: Finalizer<E> = Box::new(move |exit| {
                            Effect::from_run(move |scope| {
                                Box::pin(async move {
                                    match release_all(finalizers, exit, scope).await {
                                        None => Outcome::Completed(()),
                                        Some(error) => Outcome::Errored(error),
                                    }
                                })
                            })
                        });
                        Outcome::Completed((downcast_value::<A>(value), release))
                    }
                    Outcome::Errored(e) => {
                        let exit = ExitCase::Errored(e.clone());
                        if let Some(discarded) = release_all(finalizers, exit, scope).await {
                            report_discarded(&discarded);
                        }
                        Outcome::Errored(e)
                    }
                    Outcome::Canceled => {
                        if let Some(discarded) =
                            release_all(finalizers, ExitCase::Canceled, scope).await
                        {
                            report_discarded(&discarded);
                        }
                        Outcome::Canceled
                    }
                }
            })
        })
    }
}

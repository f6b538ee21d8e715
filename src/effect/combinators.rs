//! Sequencing, error handling, and bracketing combinators.

use std::fmt::Debug;

use crate::effect::{report_discarded, Effect};
use crate::exit::{ExitCase, Outcome};

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Transform the success value.
    pub fn map<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        Effect::from_run(move |scope| Box::pin(async move { self.run(scope).await.map(f) }))
    }

    /// Sequence another effect after this one.
    ///
    /// Errors and cancellation short-circuit: the continuation only runs on
    /// success.
    pub fn and_then<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Effect<B, E> + Send + 'static,
    {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                match self.run(scope.clone()).await {
                    Outcome::Completed(a) => f(a).run(scope).await,
                    Outcome::Errored(e) => Outcome::Errored(e),
                    Outcome::Canceled => Outcome::Canceled,
                }
            })
        })
    }

    /// Transform the error value.
    pub fn map_err<E2, F>(self, f: F) -> Effect<A, E2>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                match self.run(scope).await {
                    Outcome::Completed(a) => Outcome::Completed(a),
                    Outcome::Errored(e) => Outcome::Errored(f(e)),
                    Outcome::Canceled => Outcome::Canceled,
                }
            })
        })
    }

    /// Surface the error channel as a value.
    ///
    /// A raised error becomes `Ok`-side data (`Err(e)`); cancellation is not
    /// an error and passes through unchanged.
    pub fn attempt(self) -> Effect<Result<A, E>, E> {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                match self.run(scope).await {
                    Outcome::Completed(a) => Outcome::Completed(Ok(a)),
                    Outcome::Errored(e) => Outcome::Completed(Err(e)),
                    Outcome::Canceled => Outcome::Canceled,
                }
            })
        })
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    /// Run a finalizer after this effect, on every exit path.
    ///
    /// Shorthand for [`Effect::guarantee_case`] with an exit-blind
    /// finalizer.
    pub fn guarantee(self, finalizer: Effect<(), E>) -> Self {
        self.guarantee_case(move |_| finalizer)
    }

    /// Run an exit-aware finalizer after this effect, on every exit path.
    ///
    /// The finalizer runs masked, so it completes even when the surrounding
    /// scope is being canceled. If this effect completed and the finalizer
    /// raises, the finalizer's error becomes the result; if this effect
    /// already failed or was canceled, that outcome wins and the finalizer
    /// error is logged and discarded.
    pub fn guarantee_case<F>(self, finalizer: F) -> Self
    where
        F: FnOnce(ExitCase<E>) -> Effect<(), E> + Send + 'static,
    {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                let outcome = self.run(scope.clone()).await;
                let exit = outcome.exit_case();
                settle(outcome, finalizer(exit).run(scope.mask()).await)
            })
        })
    }
}

impl<A, E> Effect<A, E>
where
    A: Clone + Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    /// Acquire with this effect, use the value, and guarantee release.
    ///
    /// Exit-blind variant of [`Effect::bracket_case`].
    pub fn bracket<B, U, R>(self, use_fn: U, release: R) -> Effect<B, E>
    where
        B: Send + 'static,
        U: FnOnce(A) -> Effect<B, E> + Send + 'static,
        R: FnOnce(A) -> Effect<(), E> + Send + 'static,
    {
        self.bracket_case(use_fn, move |a, _exit| release(a))
    }

    /// Acquire with this effect, use the value, and guarantee an exit-aware
    /// release.
    ///
    /// Acquisition runs masked: it either never starts (a cancellation
    /// request observed at entry) or completes fully, so there is never a
    /// half-acquired handle with no owner. The use step runs at the caller's
    /// mask; release always runs masked with the exit case of the use step.
    ///
    /// The acquired handle must be `Clone`: one copy flows into the use
    /// step, the original is owned by release. Wrap non-clonable handles in
    /// `Arc`.
    pub fn bracket_case<B, U, R>(self, use_fn: U, release: R) -> Effect<B, E>
    where
        B: Send + 'static,
        U: FnOnce(A) -> Effect<B, E> + Send + 'static,
        R: FnOnce(A, ExitCase<E>) -> Effect<(), E> + Send + 'static,
    {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                let acquired = match self.run(scope.mask()).await {
                    Outcome::Completed(a) => a,
                    Outcome::Errored(e) => return Outcome::Errored(e),
                    Outcome::Canceled => return Outcome::Canceled,
                };
                let retained = acquired.clone();
                let outcome = use_fn(acquired).run(scope.clone()).await;
                let exit = outcome.exit_case();
                settle(outcome, release(retained, exit).run(scope.mask()).await)
            })
        })
    }
}

/// Combine a primary outcome with a finalizer outcome.
///
/// First raised error wins: a finalizer error only surfaces when the primary
/// outcome completed; otherwise it is logged and discarded.
pub(crate) fn settle<A, E: Debug>(primary: Outcome<A, E>, finalized: Outcome<(), E>) -> Outcome<A, E> {
    match finalized {
        Outcome::Completed(()) | Outcome::Canceled => primary,
        Outcome::Errored(rel_err) => match primary {
            Outcome::Completed(_) => Outcome::Errored(rel_err),
            other => {
                report_discarded(&rel_err);
                other
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelScope;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn root() -> CancelScope {
        CancelScope::root()
    }

    #[tokio::test]
    async fn map_and_then_compose() {
        let effect = Effect::<_, String>::pure(10)
            .map(|n| n * 2)
            .and_then(|n| Effect::pure(n + 1));
        assert_eq!(effect.run(root()).await, Outcome::Completed(21));
    }

    #[tokio::test]
    async fn and_then_short_circuits_on_error() {
        let effect = Effect::<i32, _>::raise_error("boom".to_string())
            .and_then(|n| Effect::pure(n + 1));
        assert_eq!(effect.run(root()).await, Outcome::Errored("boom".to_string()));
    }

    #[tokio::test]
    async fn attempt_captures_error_as_value() {
        let effect = Effect::<i32, _>::raise_error("boom".to_string()).attempt();
        assert_eq!(
            effect.run(root()).await,
            Outcome::Completed(Err("boom".to_string()))
        );
    }

    #[tokio::test]
    async fn attempt_passes_cancellation_through() {
        let effect = Effect::<i32, String>::canceled().attempt();
        assert_eq!(effect.run(root()).await, Outcome::Canceled);
    }

    #[tokio::test]
    async fn map_err_transforms_error() {
        let effect = Effect::<i32, _>::raise_error("boom").map_err(|e| format!("wrapped: {}", e));
        assert_eq!(
            effect.run(root()).await,
            Outcome::Errored("wrapped: boom".to_string())
        );
    }

    #[tokio::test]
    async fn guarantee_runs_on_success_and_error() {
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let ok = Effect::<_, String>::pure(1).guarantee(Effect::from_fn(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        assert_eq!(ok.run(root()).await, Outcome::Completed(1));

        let c = count.clone();
        let failing = Effect::<i32, _>::raise_error("boom".to_string()).guarantee(
            Effect::from_fn(move || {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        assert_eq!(failing.run(root()).await, Outcome::Errored("boom".to_string()));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn guarantee_case_sees_the_exit_case() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let effect = Effect::<i32, _>::raise_error("boom".to_string()).guarantee_case(
            move |exit| {
                seen_clone.lock().unwrap().push(exit.kind());
                Effect::unit()
            },
        );
        effect.run(root()).await;
        assert_eq!(*seen.lock().unwrap(), vec!["errored"]);
    }

    #[tokio::test]
    async fn finalizer_error_surfaces_after_success() {
        let effect = Effect::<_, String>::pure(1)
            .guarantee(Effect::raise_error("cleanup failed".to_string()));
        assert_eq!(
            effect.run(root()).await,
            Outcome::Errored("cleanup failed".to_string())
        );
    }

    #[tokio::test]
    async fn primary_error_wins_over_finalizer_error() {
        let effect = Effect::<i32, _>::raise_error("boom".to_string())
            .guarantee(Effect::raise_error("cleanup failed".to_string()));
        assert_eq!(effect.run(root()).await, Outcome::Errored("boom".to_string()));
    }

    #[tokio::test]
    async fn bracket_releases_on_use_failure() {
        let released = Arc::new(AtomicBool::new(false));
        let released_clone = released.clone();

        let effect = Effect::<_, String>::pure(42).bracket(
            |_n| Effect::<i32, _>::raise_error("use failed".to_string()),
            move |_n| {
                Effect::from_fn(move || {
                    released_clone.store(true, Ordering::SeqCst);
                    Ok(())
                })
            },
        );

        assert_eq!(
            effect.run(root()).await,
            Outcome::Errored("use failed".to_string())
        );
        assert!(released.load(Ordering::SeqCst), "cleanup must run on failure");
    }

    #[tokio::test]
    async fn bracket_skips_release_when_acquire_fails() {
        let released = Arc::new(AtomicBool::new(false));
        let released_clone = released.clone();

        let effect = Effect::<i32, _>::raise_error("acquire failed".to_string()).bracket(
            |n| Effect::pure(n),
            move |_n| {
                Effect::from_fn(move || {
                    released_clone.store(true, Ordering::SeqCst);
                    Ok(())
                })
            },
        );

        assert_eq!(
            effect.run(root()).await,
            Outcome::Errored("acquire failed".to_string())
        );
        assert!(
            !released.load(Ordering::SeqCst),
            "cleanup must NOT run when acquire fails"
        );
    }

    #[tokio::test]
    async fn bracket_case_tags_cancellation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let effect = Effect::<_, String>::pure("handle").bracket_case(
            |_h| Effect::<i32, _>::canceled(),
            move |_h, exit| {
                seen_clone.lock().unwrap().push(exit.kind());
                Effect::unit()
            },
        );

        assert_eq!(effect.run(root()).await, Outcome::Canceled);
        assert_eq!(*seen.lock().unwrap(), vec!["canceled"]);
    }
}

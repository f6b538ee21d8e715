//! Constructors for creating effects.

use std::future::Future;

use crate::effect::Effect;
use crate::exit::Outcome;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// An effect that immediately completes with the given value.
    pub fn pure(value: A) -> Self {
        Effect::from_run(move |_scope| Box::pin(async move { Outcome::Completed(value) }))
    }

    /// An effect that immediately raises the given error.
    pub fn raise_error(error: E) -> Self {
        Effect::from_run(move |_scope| Box::pin(async move { Outcome::Errored(error) }))
    }

    /// An effect from a synchronous fallible computation.
    ///
    /// The closure runs when the effect does, not when it is built.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<A, E> + Send + 'static,
    {
        Effect::from_run(move |_scope| {
            Box::pin(async move {
                match f() {
                    Ok(a) => Outcome::Completed(a),
                    Err(e) => Outcome::Errored(e),
                }
            })
        })
    }

    /// An effect from a future.
    ///
    /// The future is polled to completion once the effect runs; the entry
    /// cancellation check of [`Effect::run`] is the only poll point a plain
    /// lifted future gets, so long-running futures should be composed from
    /// smaller effects if they need to observe cancellation.
    pub fn from_async<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<A, E>> + Send + 'static,
    {
        Effect::from_run(move |_scope| {
            Box::pin(async move {
                match fut.await {
                    Ok(a) => Outcome::Completed(a),
                    Err(e) => Outcome::Errored(e),
                }
            })
        })
    }

    /// Defer the construction of an effect until it runs.
    ///
    /// Useful for recursion and for keeping side effects out of program
    /// construction.
    pub fn defer<F>(f: F) -> Self
    where
        F: FnOnce() -> Effect<A, E> + Send + 'static,
    {
        Effect::from_run(move |scope| f().run(scope))
    }

    /// An effect that completes as canceled.
    ///
    /// Self-cancellation: finalizers guarding the surrounding program
    /// observe [`ExitCase::Canceled`](crate::ExitCase::Canceled). Does not
    /// touch the scope's token.
    pub fn canceled() -> Self {
        Effect::from_run(move |_scope| Box::pin(async move { Outcome::Canceled }))
    }

    /// An effect that never completes, unless its scope is canceled.
    ///
    /// Inside a masked region this suspends forever.
    pub fn never() -> Self {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                scope.cancelled().await;
                Outcome::Canceled
            })
        })
    }
}

impl<E> Effect<(), E>
where
    E: Send + 'static,
{
    /// An effect that completes with `()`.
    pub fn unit() -> Self {
        Effect::pure(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{CancelScope, CancelToken};

    #[tokio::test]
    async fn pure_completes() {
        let outcome = Effect::<_, String>::pure(7).run(CancelScope::root()).await;
        assert_eq!(outcome, Outcome::Completed(7));
    }

    #[tokio::test]
    async fn raise_error_errors() {
        let outcome = Effect::<i32, _>::raise_error("boom").run(CancelScope::root()).await;
        assert_eq!(outcome, Outcome::Errored("boom"));
    }

    #[tokio::test]
    async fn from_fn_is_lazy() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let effect = Effect::<_, String>::from_fn(move || {
            ran_clone.store(true, Ordering::SeqCst);
            Ok(1)
        });
        assert!(!ran.load(Ordering::SeqCst), "building must not run the closure");

        effect.run(CancelScope::root()).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn from_async_propagates_error() {
        let effect = Effect::<i32, _>::from_async(async { Err("boom".to_string()) });
        assert_eq!(
            effect.run(CancelScope::root()).await,
            Outcome::Errored("boom".to_string())
        );
    }

    #[tokio::test]
    async fn canceled_completes_as_canceled() {
        let outcome = Effect::<i32, String>::canceled().run(CancelScope::root()).await;
        assert_eq!(outcome, Outcome::Canceled);
    }

    #[tokio::test]
    async fn never_resolves_on_cancellation() {
        let token = CancelToken::new();
        let scope = CancelScope::new(token.clone());
        let handle = tokio::spawn(Effect::<i32, String>::never().run(scope));
        token.cancel();
        assert_eq!(handle.await.unwrap(), Outcome::Canceled);
    }

    #[tokio::test]
    async fn defer_builds_at_run_time() {
        let effect = Effect::<i32, String>::defer(|| Effect::pure(5));
        assert_eq!(effect.run(CancelScope::root()).await, Outcome::Completed(5));
    }
}

//! Where fibers actually run.

use crate::effect::{BoxFuture, Effect};
use crate::exit::Outcome;

/// The executor surface the concurrency layer needs.
///
/// Two capabilities only: spawn a task, and yield the current one. Anything
/// that can do both can drive fibers; [`TokioRuntime`] is the stock
/// implementation.
pub trait EffectRuntime: Send + Sync + 'static {
    /// Schedule a task to run concurrently with the caller.
    fn spawn(&self, task: BoxFuture<'static, ()>);

    /// A future that yields the current task back to the scheduler once.
    fn cede(&self) -> BoxFuture<'static, ()>;
}

/// [`EffectRuntime`] backed by the ambient tokio runtime.
///
/// Spawning outside a tokio runtime context panics, as `tokio::spawn` does.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRuntime;

impl EffectRuntime for TokioRuntime {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }

    fn cede(&self) -> BoxFuture<'static, ()> {
        Box::pin(tokio::task::yield_now())
    }
}

impl<E> Effect<(), E>
where
    E: Send + 'static,
{
    /// Yield to the scheduler once, then continue.
    ///
    /// A voluntary poll point: a pending cancellation request is observed
    /// on the way in.
    pub fn cede<R>(runtime: R) -> Self
    where
        R: EffectRuntime,
    {
        Effect::from_run(move |_scope| {
            Box::pin(async move {
                runtime.cede().await;
                Outcome::Completed(())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{CancelScope, CancelToken};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn cede_completes() {
        let effect = Effect::<(), String>::cede(TokioRuntime);
        assert_eq!(effect.run(CancelScope::root()).await, Outcome::Completed(()));
    }

    #[tokio::test]
    async fn cede_touches_the_runtime_only_when_run() {
        #[derive(Clone)]
        struct CountingRuntime {
            yields: Arc<AtomicUsize>,
        }

        impl EffectRuntime for CountingRuntime {
            fn spawn(&self, task: BoxFuture<'static, ()>) {
                tokio::spawn(task);
            }

            fn cede(&self) -> BoxFuture<'static, ()> {
                self.yields.fetch_add(1, Ordering::SeqCst);
                Box::pin(tokio::task::yield_now())
            }
        }

        let yields = Arc::new(AtomicUsize::new(0));
        let effect = Effect::<(), String>::cede(CountingRuntime {
            yields: yields.clone(),
        });
        assert_eq!(yields.load(Ordering::SeqCst), 0, "building must not yield");
        assert_eq!(effect.run(CancelScope::root()).await, Outcome::Completed(()));
        assert_eq!(yields.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cede_is_a_poll_point() {
        let token = CancelToken::new();
        token.cancel();
        let effect = Effect::<(), String>::cede(TokioRuntime);
        assert_eq!(
            effect.run(CancelScope::new(token)).await,
            Outcome::Canceled
        );
    }
}

//! Cancellation masking.
//!
//! [`Effect::uncancelable`] runs a region with cancellation requests
//! suppressed. The body receives a [`Poll`] capability that restores the
//! surrounding cancelability for chosen sub-effects, so a masked region can
//! still park on an interruptible wait without opening the whole region to
//! interruption.

use crate::effect::Effect;

/// Capability handed to the body of [`Effect::uncancelable`].
///
/// Applying it to an effect restores the cancelability that was in force
/// *outside* the enclosing masked region. Inside nested masks, one `apply`
/// peels exactly one layer.
#[derive(Debug, Clone, Copy)]
pub struct Poll {
    _private: (),
}

impl Poll {
    /// Run `effect` with one layer of masking removed.
    pub fn apply<A, E>(&self, effect: Effect<A, E>) -> Effect<A, E>
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        Effect::from_run(move |scope| effect.run(scope.unmask()))
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Run `body` with cancellation requests masked.
    ///
    /// A cancellation request arriving while the region runs is remembered
    /// on the token and takes effect at the next poll point outside the
    /// mask. The body's `Poll` argument selectively restores cancelability:
    ///
    /// ```rust,ignore
    /// let guarded = Effect::<_, Error>::uncancelable(|poll| {
    ///     acquire_lock().and_then(move |lock| {
    ///         poll.apply(wait_for_work(lock.clone()))
    ///             .guarantee(release_lock(lock))
    ///     })
    /// });
    /// ```
    pub fn uncancelable<F>(body: F) -> Self
    where
        F: FnOnce(Poll) -> Effect<A, E> + Send + 'static,
    {
        Effect::from_run(move |scope| body(Poll { _private: () }).run(scope.mask()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{CancelScope, CancelToken};
    use crate::exit::Outcome;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn masked_region_completes_despite_mid_flight_request() {
        let token = CancelToken::new();
        let scope = CancelScope::new(token.clone());

        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let effect = Effect::<_, String>::uncancelable(move |_poll| {
            Effect::from_fn(move || {
                token.cancel();
                Ok(())
            })
            .and_then(move |_| {
                Effect::from_fn(move || {
                    ran_clone.store(true, Ordering::SeqCst);
                    Ok(7)
                })
            })
        });

        assert_eq!(effect.run(scope).await, Outcome::Completed(7));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn poll_restores_cancelability_inside_mask() {
        let token = CancelToken::new();
        let scope = CancelScope::new(token.clone());

        let effect = Effect::<i32, String>::uncancelable(move |poll| {
            Effect::from_fn(move || {
                token.cancel();
                Ok(1)
            })
            .and_then(move |_| poll.apply(Effect::pure(2)))
        });

        // The polled sub-effect observes the pending request and stops.
        assert_eq!(effect.run(scope).await, Outcome::Canceled);
    }

    #[tokio::test]
    async fn pending_request_fires_after_the_mask_ends() {
        let token = CancelToken::new();
        let scope = CancelScope::new(token.clone());

        let masked = Effect::<_, String>::uncancelable(move |_poll| {
            Effect::from_fn(move || {
                token.cancel();
                Ok(1)
            })
        });
        let effect = masked.and_then(|n| Effect::pure(n + 1));

        assert_eq!(effect.run(scope).await, Outcome::Canceled);
    }
}

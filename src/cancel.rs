//! Cooperative cancellation: tokens, scopes, and masking.
//!
//! Cancellation in this crate is never preemptive. A [`CancelToken`] is an
//! `Arc`-shared flag; requesting cancellation sets the flag and wakes anyone
//! waiting on it. Effects check the flag at their suspension points (every
//! [`Effect::run`](crate::Effect::run) boundary) and complete with
//! [`Outcome::Canceled`](crate::Outcome::Canceled) instead of being torn
//! down mid-flight.
//!
//! A [`CancelScope`] pairs a token with a mask depth. While the mask is
//! non-zero the flag is invisible, which is how
//! [`Effect::uncancelable`](crate::Effect::uncancelable) suppresses
//! interruption for a region and how release logic is shielded while it runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared cancellation flag with async wake-up.
///
/// Cloning a token clones the handle, not the flag: all clones observe the
/// same cancellation request. Requesting cancellation is idempotent.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug)]
struct TokenInner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a fresh, unset token.
    pub fn new() -> Self {
        CancelToken {
            inner: Arc::new(TokenInner {
                flag: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Request cancellation, waking every waiter. Idempotent.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// Wait until cancellation is requested.
    ///
    /// Returns immediately if the token is already set.
    pub async fn cancelled(&self) {
        loop {
            // Register the waiter before checking the flag so a cancel
            // between the check and the await cannot be missed.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A cancellation token plus the current mask depth.
///
/// Effects run inside a scope; the scope decides whether a pending
/// cancellation request is currently observable. Scopes are cheap to clone
/// and are threaded through every effect boundary.
#[derive(Clone, Debug)]
pub struct CancelScope {
    token: CancelToken,
    mask: u32,
}

impl CancelScope {
    /// A scope over the given token with no masking.
    pub fn new(token: CancelToken) -> Self {
        CancelScope { token, mask: 0 }
    }

    /// A scope over a fresh token; the usual entry point for running a
    /// top-level effect.
    pub fn root() -> Self {
        CancelScope::new(CancelToken::new())
    }

    /// The underlying token, e.g. to request cancellation from elsewhere.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Whether a cancellation request is observable right now.
    ///
    /// True only when the token is set and no mask is active.
    pub fn cancel_requested(&self) -> bool {
        self.mask == 0 && self.token.is_canceled()
    }

    /// Wait until a cancellation request becomes observable in this scope.
    ///
    /// Inside a masked region this never resolves.
    pub async fn cancelled(&self) {
        if self.mask > 0 {
            std::future::pending::<()>().await;
        }
        self.token.cancelled().await;
    }

    /// The same scope one mask level deeper.
    pub(crate) fn mask(&self) -> Self {
        CancelScope {
            token: self.token.clone(),
            mask: self.mask + 1,
        }
    }

    /// The same scope one mask level shallower.
    ///
    /// Saturates at zero: polling an already-unmasked scope is a no-op
    /// rather than an error.
    pub(crate) fn unmask(&self) -> Self {
        CancelScope {
            token: self.token.clone(),
            mask: self.mask.saturating_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_unset() {
        let token = CancelToken::new();
        assert!(!token.is_canceled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_canceled());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_canceled());
    }

    #[test]
    fn masked_scope_hides_the_flag() {
        let scope = CancelScope::root();
        scope.token().cancel();
        assert!(scope.cancel_requested());
        assert!(!scope.mask().cancel_requested());
        assert!(scope.mask().unmask().cancel_requested());
    }

    #[test]
    fn unmask_saturates_at_zero() {
        let scope = CancelScope::root();
        let unmasked = scope.unmask();
        scope.token().cancel();
        assert!(unmasked.cancel_requested());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_set() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }
}

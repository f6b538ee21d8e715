//! Fibers: resource programs running concurrently.
//!
//! [`Resource::start`] spawns a program on an [`EffectRuntime`] and yields
//! a [`Fiber`] handle scoped to the surrounding resource: when the scope
//! that started the fiber ends, the fiber is canceled and fully released
//! before the scope's own finalizers continue. [`Fiber::join`] waits for
//! the program and hands its acquired value back as a [`Resource`], so the
//! value's release re-scopes into the joiner.

use std::fmt;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::cancel::{CancelScope, CancelToken};
use crate::concurrent::runtime::EffectRuntime;
use crate::effect::Effect;
use crate::exit::{ExitCase, Outcome};
use crate::resource::{Finalizer, Resource};

/// How far the spawned program has gotten, and whether its result is still
/// claimable.
enum JoinCell<A, E> {
    Pending,
    Done(Outcome<(A, Finalizer<E>), E>),
    Consumed,
}

struct FiberShared<A, E> {
    cell: Mutex<JoinCell<A, E>>,
    wake: Notify,
    token: CancelToken,
}

impl<A, E> FiberShared<A, E> {
    fn lock(&self) -> MutexGuard<'_, JoinCell<A, E>> {
        self.cell.lock().expect("fiber state lock poisoned")
    }

    /// Claim the settled result. `None` while still running; a claim after
    /// someone else consumed the result reads as canceled.
    fn take(&self) -> Option<Outcome<(A, Finalizer<E>), E>> {
        let mut cell = self.lock();
        match std::mem::replace(&mut *cell, JoinCell::Consumed) {
            JoinCell::Pending => {
                *cell = JoinCell::Pending;
                None
            }
            JoinCell::Done(outcome) => Some(outcome),
            JoinCell::Consumed => Some(Outcome::Canceled),
        }
    }

    fn is_pending(&self) -> bool {
        matches!(*self.lock(), JoinCell::Pending)
    }

    fn state_label(&self) -> &'static str {
        match *self.lock() {
            JoinCell::Pending => "pending",
            JoinCell::Done(_) => "settled",
            JoinCell::Consumed => "consumed",
        }
    }

    /// Wait until the spawned program has settled.
    async fn settled(&self) {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_pending() {
                return;
            }
            notified.await;
        }
    }
}

/// Handle to a concurrently running resource program.
///
/// Clones share the same underlying fiber. The result can be claimed once:
/// either by [`Fiber::join`] or by the release path of [`Fiber::cancel`].
pub struct Fiber<A, E> {
    shared: Arc<FiberShared<A, E>>,
}

impl<A, E> Clone for Fiber<A, E> {
    fn clone(&self) -> Self {
        Fiber {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, E> fmt::Debug for Fiber<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fiber").field(&self.shared.state_label()).finish()
    }
}

impl<A, E> Fiber<A, E>
where
    A: Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    pub(crate) fn spawn<R>(program: Resource<A, E>, runtime: &R) -> Self
    where
        R: EffectRuntime + ?Sized,
    {
        let shared = Arc::new(FiberShared {
            cell: Mutex::new(JoinCell::Pending),
            wake: Notify::new(),
            token: CancelToken::new(),
        });
        let task_shared = Arc::clone(&shared);
        runtime.spawn(Box::pin(async move {
            let scope = CancelScope::new(task_shared.token.clone());
            let outcome = program.allocated_case().run(scope).await;
            *task_shared.lock() = JoinCell::Done(outcome);
            task_shared.wake.notify_waiters();
        }));
        Fiber { shared }
    }

    /// Wait for the fiber and claim its outcome.
    ///
    /// A completed fiber yields its value as a [`Resource`], re-scoping the
    /// value's release into whoever uses it. Joining is interruptible: if
    /// the joiner's own scope is canceled while waiting, the join resolves
    /// as canceled and the fiber keeps running.
    ///
    /// If the fiber's result was already claimed by a cancelation, the
    /// outcome reads as canceled.
    pub fn join(self) -> Effect<Outcome<Resource<A, E>, E>, E> {
        Effect::from_run(move |scope| {
            Box::pin(async move {
                loop {
                    let notified = self.shared.wake.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();
                    if let Some(done) = self.shared.take() {
                        return Outcome::Completed(done.map(|(value, finalizer)| {
                            Resource::from_allocated(value, finalizer)
                        }));
                    }
                    let canceled = scope.cancelled();
                    futures::pin_mut!(canceled);
                    if let futures::future::Either::Right(_) =
                        futures::future::select(notified, canceled).await
                    {
                        return Outcome::Canceled;
                    }
                }
            })
        })
    }

    /// Request cancellation and wait until the fiber has fully settled.
    ///
    /// If the fiber had already completed and nobody joined it, its
    /// acquired value is released here with [`ExitCase::Canceled`], and a
    /// release error propagates. Canceling twice, or canceling a joined
    /// fiber, is a no-op.
    pub fn cancel(&self) -> Effect<(), E> {
        let shared = Arc::clone(&self.shared);
        Effect::from_run(move |scope| {
            Box::pin(async move {
                shared.token.cancel();
                shared.settled().await;
                match shared.take() {
                    Some(Outcome::Completed((_value, finalizer))) => {
                        finalizer(ExitCase::Canceled).run(scope.mask()).await
                    }
                    _ => Outcome::Completed(()),
                }
            })
        })
    }

    /// Wait without claiming; used by racing.
    pub(crate) async fn settled(&self) {
        self.shared.settled().await;
    }

    /// Claim the settled outcome if there is one.
    pub(crate) fn settle_now(&self) -> Option<Outcome<Resource<A, E>, E>> {
        self.shared.take().map(|done| {
            done.map(|(value, finalizer)| Resource::from_allocated(value, finalizer))
        })
    }
}

impl<A, E> Resource<A, E>
where
    A: Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    /// Run this program concurrently, scoped to the surrounding resource.
    ///
    /// Acquisition spawns the program and yields its [`Fiber`]; release
    /// cancels the fiber and waits for it to wind down. A fiber therefore
    /// never outlives the scope that started it.
    pub fn start<R>(self, runtime: R) -> Resource<Fiber<A, E>, E>
    where
        R: EffectRuntime,
    {
        let acquire = Effect::from_fn(move || Ok(Fiber::spawn(self, &runtime)));
        Resource::make(acquire, |fiber| fiber.cancel())
    }
}

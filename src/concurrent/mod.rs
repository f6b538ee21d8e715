//! Concurrent resource programs.
//!
//! Everything here runs on an [`EffectRuntime`], a minimal executor
//! surface with a stock tokio implementation. [`Resource::start`] spawns a
//! program as a [`Fiber`] scoped to the resource that started it;
//! [`Resource::race_pair`] races two programs and reports the winner
//! without losing track of the loser.
//!
//! Fibers follow structured lifetimes: a fiber cannot outlive the scope
//! that started it, and joining a completed fiber transfers its value,
//! release obligations included, into the joiner's scope.

mod fiber;
mod race;
mod runtime;

pub use fiber::Fiber;
pub use race::RaceWinner;
pub use runtime::{EffectRuntime, TokioRuntime};

use crate::resource::Resource;

impl<E> Resource<(), E>
where
    E: Send + 'static,
{
    /// Yield to the scheduler once.
    ///
    /// A cooperative scheduling point for long resource programs; also a
    /// poll point where pending cancellation is observed.
    pub fn cede<R>(runtime: R) -> Self
    where
        R: EffectRuntime,
    {
        Resource::lift(crate::effect::Effect::cede(runtime))
    }
}

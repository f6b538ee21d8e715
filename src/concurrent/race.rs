//! Racing two resource programs.

use std::fmt;
use std::fmt::Debug;

use futures::future::{select, Either};

use crate::concurrent::fiber::Fiber;
use crate::concurrent::runtime::EffectRuntime;
use crate::effect::Effect;
use crate::exit::Outcome;
use crate::resource::Resource;

/// Which side of a race settled first, with the winner's outcome and a
/// live handle to the loser.
///
/// A completed winner's value arrives as a [`Resource`], re-scoping its
/// release into whoever uses it. The loser fiber is still scoped to the
/// race: it is canceled when the race's resource scope ends, or earlier if
/// the winner did not complete.
pub enum RaceWinner<A, B, E> {
    /// The left program settled first.
    Left(Outcome<Resource<A, E>, E>, Fiber<B, E>),
    /// The right program settled first.
    Right(Fiber<A, E>, Outcome<Resource<B, E>, E>),
}

impl<A, B, E> fmt::Debug for RaceWinner<A, B, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceWinner::Left(..) => f.write_str("RaceWinner::Left"),
            RaceWinner::Right(..) => f.write_str("RaceWinner::Right"),
        }
    }
}

impl<A, E> Resource<A, E>
where
    A: Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    /// Race this program against another.
    ///
    /// Both sides are started as fibers scoped to the returned resource.
    /// The yielded value reports which side settled first along with its
    /// outcome; the loser keeps running and can be joined or canceled. If
    /// the winner errored or was canceled, the loser is canceled before
    /// the winner is reported, so a failed race never leaks a runaway
    /// fiber into user code.
    pub fn race_pair<B, R>(
        self,
        other: Resource<B, E>,
        runtime: R,
    ) -> Resource<RaceWinner<A, B, E>, E>
    where
        B: Send + 'static,
        R: EffectRuntime + Clone,
    {
        let right_runtime = runtime.clone();
        self.start(runtime).flat_map(move |left_fiber| {
            other.start(right_runtime).flat_map(move |right_fiber| {
                Resource::lift(race_fibers(left_fiber, right_fiber))
            })
        })
    }
}

fn race_fibers<A, B, E>(
    left: Fiber<A, E>,
    right: Fiber<B, E>,
) -> Effect<RaceWinner<A, B, E>, E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    Effect::from_run(move |scope| {
        Box::pin(async move {
            {
                let left_settled = left.settled();
                let right_settled = right.settled();
                let canceled = scope.cancelled();
                futures::pin_mut!(left_settled, right_settled, canceled);
                if let Either::Right(_) =
                    select(select(left_settled, right_settled), canceled).await
                {
                    // Both fibers unwind via their scope finalizers.
                    return Outcome::Canceled;
                }
            }

            // At least one side has settled; prefer the left on a tie.
            if let Some(outcome) = left.settle_now() {
                if !outcome.is_completed() {
                    drain_cancel(&right, &scope).await;
                }
                return Outcome::Completed(RaceWinner::Left(outcome, right));
            }
            let outcome = right
                .settle_now()
                .unwrap_or(Outcome::Canceled);
            if !outcome.is_completed() {
                drain_cancel(&left, &scope).await;
            }
            Outcome::Completed(RaceWinner::Right(left, outcome))
        })
    })
}

/// Cancel the losing side of a failed race, discarding its release errors.
async fn drain_cancel<A, E>(loser: &Fiber<A, E>, scope: &crate::cancel::CancelScope)
where
    A: Send + 'static,
    E: Clone + Debug + Send + 'static,
{
    if let Outcome::Errored(e) = loser.cancel().run(scope.mask()).await {
        crate::effect::report_discarded(&e);
    }
}

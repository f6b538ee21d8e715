//! Stack-safe monadic recursion.

use std::ops::ControlFlow;

use crate::effect::Effect;
use crate::resource::Resource;

impl<A, E> Resource<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Iterate `step` from `seed` until it breaks with a final value.
    ///
    /// Each iteration is deferred through a suspension, so the loop runs in
    /// constant stack space regardless of iteration count. Finalizers
    /// registered by any iteration stay scoped to the whole loop and
    /// release in reverse order when the surrounding scope ends.
    pub fn tail_rec_m<S, F>(seed: S, mut step: F) -> Self
    where
        S: Send + 'static,
        F: FnMut(S) -> Resource<ControlFlow<A, S>, E> + Send + 'static,
    {
        let first = step(seed);
        first.flat_map(move |flow| match flow {
            ControlFlow::Break(value) => Resource::pure(value),
            ControlFlow::Continue(next) => Resource::suspend(Effect::from_fn(move || {
                Ok(Resource::tail_rec_m(next, step))
            })),
        })
    }
}

//! Exit signals and completion outcomes.
//!
//! Every finalizer in this crate receives an [`ExitCase`] describing how the
//! computation it guards finished, so cleanup logic can react differently to
//! success, failure, and cancellation (e.g. roll back a transaction only on
//! error, or skip expensive flushing on cancellation).
//!
//! [`Outcome`] is the tri-state result of running an [`Effect`](crate::Effect)
//! or joining a [`Fiber`](crate::Fiber): alongside the usual success and error
//! channels it carries cancellation as a first-class value rather than as a
//! dropped future.

/// How a guarded computation finished.
///
/// Passed to every release function so cleanup can distinguish the three exit
/// paths. The error variant carries the error that terminated the computation.
///
/// # Example
///
/// ```rust,ignore
/// let r = Resource::make_case(open(), |conn, exit| match exit {
///     ExitCase::Completed => conn.commit(),
///     ExitCase::Errored(_) | ExitCase::Canceled => conn.rollback(),
/// });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCase<E> {
    /// The computation produced a value.
    Completed,
    /// The computation raised an error.
    Errored(E),
    /// The computation observed a cancellation request.
    Canceled,
}

impl<E> ExitCase<E> {
    /// Returns `true` for [`ExitCase::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, ExitCase::Completed)
    }

    /// Returns `true` for [`ExitCase::Errored`].
    pub fn is_errored(&self) -> bool {
        matches!(self, ExitCase::Errored(_))
    }

    /// Returns `true` for [`ExitCase::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, ExitCase::Canceled)
    }

    /// Returns the error that terminated the computation, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            ExitCase::Errored(e) => Some(e),
            _ => None,
        }
    }

    /// A short static label for the variant, useful in logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            ExitCase::Completed => "completed",
            ExitCase::Errored(_) => "errored",
            ExitCase::Canceled => "canceled",
        }
    }

    /// Maps the error type using the provided function.
    pub fn map<F, E2>(self, f: F) -> ExitCase<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            ExitCase::Completed => ExitCase::Completed,
            ExitCase::Errored(e) => ExitCase::Errored(f(e)),
            ExitCase::Canceled => ExitCase::Canceled,
        }
    }
}

/// The result of running an effect to completion.
///
/// Unlike `Result`, an `Outcome` has a third channel for cooperative
/// cancellation: an effect that observes a cancellation request completes
/// with [`Outcome::Canceled`] instead of being torn down mid-flight, which is
/// what lets release logic run on every exit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<A, E> {
    /// The effect produced a value.
    Completed(A),
    /// The effect raised an error.
    Errored(E),
    /// The effect was canceled before producing a value.
    Canceled,
}

impl<A, E> Outcome<A, E> {
    /// Returns `true` for [`Outcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Returns `true` for [`Outcome::Errored`].
    pub fn is_errored(&self) -> bool {
        matches!(self, Outcome::Errored(_))
    }

    /// Returns `true` for [`Outcome::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }

    /// Returns the produced value, if any.
    pub fn completed(self) -> Option<A> {
        match self {
            Outcome::Completed(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the raised error, if any.
    pub fn errored(self) -> Option<E> {
        match self {
            Outcome::Errored(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the success value using the provided function.
    pub fn map<F, B>(self, f: F) -> Outcome<B, E>
    where
        F: FnOnce(A) -> B,
    {
        match self {
            Outcome::Completed(a) => Outcome::Completed(f(a)),
            Outcome::Errored(e) => Outcome::Errored(e),
            Outcome::Canceled => Outcome::Canceled,
        }
    }

    /// Converts into a `Result`, folding cancellation through `canceled`.
    pub fn into_result<F>(self, canceled: F) -> Result<A, E>
    where
        F: FnOnce() -> E,
    {
        match self {
            Outcome::Completed(a) => Ok(a),
            Outcome::Errored(e) => Err(e),
            Outcome::Canceled => Err(canceled()),
        }
    }

    /// The exit signal finalizers receive for this outcome.
    ///
    /// The error is cloned because a single exit signal fans out to every
    /// finalizer on the release stack.
    pub fn exit_case(&self) -> ExitCase<E>
    where
        E: Clone,
    {
        match self {
            Outcome::Completed(_) => ExitCase::Completed,
            Outcome::Errored(e) => ExitCase::Errored(e.clone()),
            Outcome::Canceled => ExitCase::Canceled,
        }
    }
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<E> Arbitrary for ExitCase<E>
where
    E: Arbitrary + 'static,
{
    type Parameters = E::Parameters;
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(ExitCase::Completed),
            any_with::<E>(args).prop_map(ExitCase::Errored),
            Just(ExitCase::Canceled),
        ]
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_case_predicates() {
        let completed: ExitCase<String> = ExitCase::Completed;
        assert!(completed.is_completed());
        assert_eq!(completed.error(), None);
        assert_eq!(completed.kind(), "completed");

        let errored: ExitCase<&str> = ExitCase::Errored("boom");
        assert!(errored.is_errored());
        assert_eq!(errored.error(), Some(&"boom"));
        assert_eq!(errored.kind(), "errored");

        let canceled: ExitCase<String> = ExitCase::Canceled;
        assert!(canceled.is_canceled());
        assert_eq!(canceled.kind(), "canceled");
    }

    #[test]
    fn exit_case_map() {
        let errored: ExitCase<i32> = ExitCase::Errored(42);
        assert_eq!(errored.map(|n| n.to_string()), ExitCase::Errored("42".to_string()));

        let completed: ExitCase<i32> = ExitCase::Completed;
        assert_eq!(completed.map(|n| n.to_string()), ExitCase::Completed);
    }

    #[test]
    fn outcome_exit_case_matches_variant() {
        let completed: Outcome<i32, String> = Outcome::Completed(1);
        assert_eq!(completed.exit_case(), ExitCase::Completed);

        let errored: Outcome<i32, String> = Outcome::Errored("boom".to_string());
        assert_eq!(errored.exit_case(), ExitCase::Errored("boom".to_string()));

        let canceled: Outcome<i32, String> = Outcome::Canceled;
        assert_eq!(canceled.exit_case(), ExitCase::Canceled);
    }

    #[test]
    fn outcome_into_result() {
        let completed: Outcome<i32, String> = Outcome::Completed(7);
        assert_eq!(completed.into_result(|| "canceled".to_string()), Ok(7));

        let canceled: Outcome<i32, String> = Outcome::Canceled;
        assert_eq!(
            canceled.into_result(|| "canceled".to_string()),
            Err("canceled".to_string())
        );
    }

    #[test]
    fn outcome_map_preserves_failure_channels() {
        let errored: Outcome<i32, &str> = Outcome::Errored("boom");
        assert_eq!(errored.map(|n| n + 1), Outcome::Errored("boom"));

        let canceled: Outcome<i32, &str> = Outcome::Canceled;
        assert_eq!(canceled.map(|n| n + 1), Outcome::Canceled);
    }
}

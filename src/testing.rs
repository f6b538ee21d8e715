//! Testing utilities and helpers for Sluice
//!
//! This module provides ergonomic utilities for testing code that uses
//! Sluice's resource and effect types: a release-order recorder and
//! assertion macros over [`Outcome`](crate::Outcome).
//!
//! # Examples
//!
//! ## ReleaseLog
//!
//! ```rust
//! use sluice::testing::ReleaseLog;
//! use sluice::{CancelScope, Effect};
//!
//! let log = ReleaseLog::new();
//! let resource = log.tracked::<String>("db", 1);
//!
//! tokio_test::block_on(async {
//!     resource.use_with(Effect::pure).run(CancelScope::root()).await;
//! });
//! assert_eq!(log.events(), vec!["acquire:db", "release:db"]);
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use sluice::{assert_completed, assert_errored, CancelScope, Effect};
//!
//! tokio_test::block_on(async {
//!     let ok = Effect::<_, String>::pure(42).run(CancelScope::root()).await;
//!     assert_completed!(ok, 42);
//!
//!     let failed = Effect::<i32, _>::raise_error("boom".to_string())
//!         .run(CancelScope::root())
//!         .await;
//!     assert_errored!(failed);
//! });
//! ```

use std::sync::{Arc, Mutex};

use crate::effect::Effect;
use crate::resource::Resource;

/// Shared recorder for acquisition and release events.
///
/// Clones share the same log, so a test can hand clones to resource
/// constructors and assert on the combined event order afterwards.
#[derive(Clone, Debug, Default)]
pub struct ReleaseLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl ReleaseLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw event.
    pub fn record(&self, event: &str) {
        self.events
            .lock()
            .expect("release log lock poisoned")
            .push(event.to_string());
    }

    /// Snapshot of the events recorded so far, in order.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("release log lock poisoned")
            .clone()
    }

    /// A resource yielding `value` that records `acquire:<name>` and
    /// `release:<name>`.
    pub fn tracked<E>(&self, name: &str, value: i32) -> Resource<i32, E>
    where
        E: Send + 'static,
    {
        let name = name.to_string();
        let acquire_log = self.clone();
        let release_log = self.clone();
        let release_name = name.clone();
        Resource::make(
            Effect::from_fn(move || {
                acquire_log.record(&format!("acquire:{}", name));
                Ok(value)
            }),
            move |_value| {
                Effect::from_fn(move || {
                    release_log.record(&format!("release:{}", release_name));
                    Ok(())
                })
            },
        )
    }

    /// Like [`ReleaseLog::tracked`], but the release event carries the exit
    /// case: `release:<name>:completed`, `:errored`, or `:canceled`.
    pub fn tracked_case<E>(&self, name: &str, value: i32) -> Resource<i32, E>
    where
        E: Send + 'static,
    {
        let name = name.to_string();
        let acquire_log = self.clone();
        let release_log = self.clone();
        let release_name = name.clone();
        Resource::make_case(
            Effect::from_fn(move || {
                acquire_log.record(&format!("acquire:{}", name));
                Ok(value)
            }),
            move |_value, exit| {
                Effect::from_fn(move || {
                    release_log.record(&format!("release:{}:{}", release_name, exit.kind()));
                    Ok(())
                })
            },
        )
    }
}

/// Assert that an [`Outcome`](crate::Outcome) completed, optionally with a
/// specific value.
#[macro_export]
macro_rules! assert_completed {
    ($outcome:expr) => {
        match &$outcome {
            $crate::Outcome::Completed(_) => {}
            other => panic!("expected Completed, got {:?}", other),
        }
    };
    ($outcome:expr, $expected:expr) => {{
        let expected = $expected;
        match &$outcome {
            $crate::Outcome::Completed(value) => assert_eq!(*value, expected),
            other => panic!("expected Completed({:?}), got {:?}", expected, other),
        }
    }};
}

/// Assert that an [`Outcome`](crate::Outcome) errored, optionally with a
/// specific error.
#[macro_export]
macro_rules! assert_errored {
    ($outcome:expr) => {
        match &$outcome {
            $crate::Outcome::Errored(_) => {}
            other => panic!("expected Errored, got {:?}", other),
        }
    };
    ($outcome:expr, $expected:expr) => {{
        let expected = $expected;
        match &$outcome {
            $crate::Outcome::Errored(error) => assert_eq!(*error, expected),
            other => panic!("expected Errored({:?}), got {:?}", expected, other),
        }
    }};
}

/// Assert that an [`Outcome`](crate::Outcome) was canceled.
#[macro_export]
macro_rules! assert_canceled {
    ($outcome:expr) => {
        match &$outcome {
            $crate::Outcome::Canceled => {}
            other => panic!("expected Canceled, got {:?}", other),
        }
    };
}

//! # Sluice
//!
//! > *"Open the gate, let it flow, close the gate"*
//!
//! A Rust library for scoped resource acquisition with guaranteed release.
//!
//! ## Philosophy
//!
//! **Sluice** treats a resource's lifetime as a program, not a convention:
//! - **Acquire** and **release** are declared together, as one value
//! - **Release always runs**, on success, error, or cancellation
//! - **Composition nests lifetimes**: later acquisitions release first
//!
//! ## Quick Example
//!
//! ```rust
//! use sluice::{CancelScope, Effect, Resource};
//!
//! #[derive(Clone)]
//! struct Conn(&'static str);
//!
//! fn connect(url: &'static str) -> Resource<Conn, String> {
//!     Resource::make(
//!         Effect::from_fn(move || Ok(Conn(url))),
//!         |_conn| Effect::from_fn(|| Ok(())),
//!     )
//! }
//!
//! // Nothing happens until the program is run; release is guaranteed.
//! let program = connect("db://primary")
//!     .flat_map(|primary| connect("db://replica").map(move |replica| (primary.clone(), replica)));
//!
//! let outcome = tokio_test::block_on(async {
//!     program
//!         .use_with(|(primary, replica)| Effect::pure((primary.0, replica.0)))
//!         .run(CancelScope::root())
//!         .await
//! });
//! assert_eq!(outcome.completed(), Some(("db://primary", "db://replica")));
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cancel;
pub mod concurrent;
pub mod effect;
pub mod exit;
pub mod resource;
pub mod testing;

// Re-exports
pub use cancel::{CancelScope, CancelToken};
pub use concurrent::{EffectRuntime, Fiber, RaceWinner, TokioRuntime};
pub use effect::{Effect, Poll};
pub use exit::{ExitCase, Outcome};
pub use resource::Resource;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::{CancelScope, CancelToken};
    pub use crate::concurrent::{EffectRuntime, Fiber, RaceWinner, TokioRuntime};
    pub use crate::effect::{Effect, Poll};
    pub use crate::exit::{ExitCase, Outcome};
    pub use crate::resource::Resource;
}

//! Wrapper types for extending counter store behavior.
//!
//! This module provides wrappers that add behavior to stores while keeping
//! them usable wherever a [`CounterStore`](crate::store::CounterStore) is
//! expected.
//!
//! # Available Wrappers
//!
//! | Wrapper | Description |
//! |---------|-------------|
//! | [`Optimistic`] | Builds an atomic increment from compare-and-swap with retries |
//! | [`Deadline`] | Fails store calls exceeding a per-call time limit |
//!
//! Wrappers compose:
//!
//! ```rust
//! use std::time::Duration;
//! use progressivi::adapters::{Deadline, Optimistic, RetryPolicy};
//! use progressivi::store::MemoryStore;
//!
//! let store = Deadline::new(
//!     Optimistic::new(MemoryStore::new()).with_policy(RetryPolicy::default().with_max_attempts(5)),
//!     Duration::from_millis(500),
//! );
//! # let _ = store;
//! ```

mod deadline;
mod optimistic;

pub use deadline::Deadline;
pub use optimistic::{Optimistic, RetryPolicy};

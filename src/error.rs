//! Error types for identifier allocation.
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`] is produced by [`CounterStore`](crate::store::CounterStore)
//!   backends and adapters. It describes *why* the store could not complete an
//!   operation.
//! - [`SequenceError`] is what callers of the [`Sequencer`](crate::sequencer::Sequencer)
//!   and [`Allocator`](crate::allocator::Allocator) see. Every store failure is
//!   surfaced as [`SequenceError::StoreUnavailable`] with the original
//!   [`StoreError`] as its source.
//!
//! # Example
//!
//! ```rust
//! use progressivi::error::SequenceError;
//! use progressivi::scope::{resolve, CounterKind, ScopeContext};
//!
//! let err = resolve(CounterKind::Brand, &ScopeContext::new().with_city("Karachi")).unwrap_err();
//! assert!(matches!(err, SequenceError::InvalidScopeContext { .. }));
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::scope::{CounterKind, ScopeKey};

/// Errors returned by identifier allocation.
///
/// None of these is ever replaced by a fabricated identifier: entity creation
/// must fail outright when allocation fails.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The caller supplied missing or malformed scoping attributes.
    ///
    /// Raised before any store access, so nothing was allocated.
    #[error("invalid scope context for {kind}: {reason}")]
    InvalidScopeContext {
        /// The counter kind being resolved.
        kind: CounterKind,
        /// What was wrong with the context.
        reason: String,
    },

    /// The counter store could not complete the allocation.
    ///
    /// No identifier was allocated and the counter is unchanged; the call is
    /// safe to retry.
    #[error("counter store unavailable for scope {scope}: {source}")]
    StoreUnavailable {
        /// The scope the allocation was attempted for.
        scope: ScopeKey,
        /// The underlying store failure.
        #[source]
        source: StoreError,
    },

    /// The sequence value needs more digits than the format allows.
    #[error("sequence value {value} for {kind} does not fit in {max_digits} digits")]
    FormatOverflow {
        /// The counter kind being formatted.
        kind: CounterKind,
        /// The value that did not fit.
        value: u64,
        /// The configured digit limit.
        max_digits: usize,
    },
}

impl SequenceError {
    /// Returns `true` if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SequenceError::StoreUnavailable { .. })
    }
}

/// Errors produced by counter store backends and adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("counter store unreachable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the configured deadline.
    #[error("counter store did not answer within {0:?}")]
    Timeout(Duration),

    /// Optimistic allocation lost every compare-and-swap race it attempted.
    #[error("gave up on {key} after {attempts} compare-and-swap attempts")]
    RetriesExhausted {
        /// The contended scope key.
        key: ScopeKey,
        /// How many attempts were made.
        attempts: u32,
    },

    /// A stored counter value could not be interpreted.
    #[error("counter {key} holds invalid data: {reason}")]
    Corrupted {
        /// The affected scope key.
        key: ScopeKey,
        /// Why the value is invalid.
        reason: String,
    },

    /// The counter reached `u64::MAX` and cannot be incremented.
    #[error("counter {key} cannot be incremented past u64::MAX")]
    Exhausted {
        /// The exhausted scope key.
        key: ScopeKey,
    },

    /// Error from the Redis backend.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for allocation operations.
pub type Result<T> = std::result::Result<T, SequenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_unavailable_is_retryable() {
        let err = SequenceError::StoreUnavailable {
            scope: ScopeKey::from_raw("customer"),
            source: StoreError::Unavailable("connection refused".into()),
        };
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "counter store unavailable for scope customer: counter store unreachable: connection refused"
        );
    }

    #[test]
    fn test_invalid_context_is_not_retryable() {
        let err = SequenceError::InvalidScopeContext {
            kind: CounterKind::Brand,
            reason: "province is required".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "invalid scope context for brand: province is required"
        );
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let err = SequenceError::StoreUnavailable {
            scope: ScopeKey::from_raw("employee"),
            source: StoreError::Timeout(Duration::from_millis(250)),
        };
        let source = err.source().expect("store error is the source");
        assert_eq!(source.to_string(), "counter store did not answer within 250ms");
    }

    #[test]
    fn test_format_overflow_message() {
        let err = SequenceError::FormatOverflow {
            kind: CounterKind::Employee,
            value: 100_000,
            max_digits: 4,
        };
        assert_eq!(
            err.to_string(),
            "sequence value 100000 for employee does not fit in 4 digits"
        );
    }
}

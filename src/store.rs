//! Counter record storage.
//!
//! A counter store keeps one [`CounterRecord`] per scope key and exposes a
//! single indivisible *fetch-and-increment* primitive. Allocation correctness
//! rests entirely on that primitive: a store must never let two concurrent
//! increments of the same key observe the same previous value.
//!
//! Two traits describe stores:
//!
//! - [`CounterStore`]: stores with a native atomic increment that creates
//!   missing records on the fly (Redis `HINCRBY`, [`MemoryStore`]).
//! - [`VersionedStore`]: stores that only offer compare-and-swap. Wrap them
//!   in [`Optimistic`](crate::adapters::Optimistic) to obtain a
//!   [`CounterStore`].
//!
//! ```text
//!    allocate(scope)
//!          │
//!          ▼
//!   ┌──────────────┐   fetch_increment   ┌───────────────────────────┐
//!   │  Allocator   │ ──────────────────► │ CounterStore              │
//!   └──────────────┘                     │  MemoryStore / RedisStore │
//!                                        │  Optimistic<Versioned>    │
//!                                        │  Deadline<CounterStore>   │
//!                                        └───────────────────────────┘
//! ```

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::scope::ScopeKey;

pub use memory::MemoryStore;

#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// One persisted counter: the last value allocated in a scope.
///
/// A record is created by the first allocation in its scope and is never
/// deleted. Its `sequence_value` only ever grows, one step at a time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterRecord {
    /// The scope this counter numbers.
    pub scope_key: ScopeKey,
    /// The last allocated value; 0 if nothing was allocated yet.
    pub sequence_value: u64,
}

impl CounterRecord {
    /// Creates a record.
    pub fn new(scope_key: ScopeKey, sequence_value: u64) -> Self {
        Self {
            scope_key,
            sequence_value,
        }
    }
}

/// A store with an atomic, upserting fetch-and-increment.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter for `key` by one and returns the new
    /// value.
    ///
    /// A missing record is created at 0 within the same operation, so the
    /// first call for a key returns 1. On error the counter is unchanged.
    async fn fetch_increment(&self, key: &ScopeKey) -> StoreResult<u64>;

    /// Returns the last allocated value for `key`, or `None` if the scope was
    /// never allocated from.
    async fn current(&self, key: &ScopeKey) -> StoreResult<Option<u64>>;

    /// Returns every counter record, sorted by scope key.
    async fn records(&self) -> StoreResult<Vec<CounterRecord>>;

    /// A short name identifying the backend in logs.
    fn name(&self) -> &'static str {
        "counter-store"
    }
}

/// A store offering compare-and-swap on counter values.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Reads the counter for `key`, `None` if the record does not exist.
    async fn load(&self, key: &ScopeKey) -> StoreResult<Option<u64>>;

    /// Sets the counter for `key` to `new` if it currently holds `expected`.
    ///
    /// `expected == None` succeeds only if the record does not exist yet.
    /// Returns `false` when the comparison failed and nothing was written.
    async fn compare_and_swap(
        &self,
        key: &ScopeKey,
        expected: Option<u64>,
        new: u64,
    ) -> StoreResult<bool>;

    /// Returns every counter record, sorted by scope key.
    async fn scan(&self) -> StoreResult<Vec<CounterRecord>>;

    /// A short name identifying the backend in logs.
    fn name(&self) -> &'static str {
        "versioned-store"
    }
}

#[async_trait]
impl<S: CounterStore + ?Sized> CounterStore for Arc<S> {
    async fn fetch_increment(&self, key: &ScopeKey) -> StoreResult<u64> {
        (**self).fetch_increment(key).await
    }

    async fn current(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        (**self).current(key).await
    }

    async fn records(&self) -> StoreResult<Vec<CounterRecord>> {
        (**self).records().await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[async_trait]
impl<S: VersionedStore + ?Sized> VersionedStore for Arc<S> {
    async fn load(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        (**self).load(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &ScopeKey,
        expected: Option<u64>,
        new: u64,
    ) -> StoreResult<bool> {
        (**self).compare_and_swap(key, expected, new).await
    }

    async fn scan(&self) -> StoreResult<Vec<CounterRecord>> {
        (**self).scan().await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

//! Per-call deadlines for counter stores.
//!
//! [`Deadline`] bounds every store call by a fixed duration. A call that does
//! not finish in time fails with [`StoreError::Timeout`], which the
//! allocator reports as `StoreUnavailable`.
//!
//! A timed-out increment may still have been applied by a remote backend.
//! The caller then sees a failure while the counter moved on: the number is
//! skipped, never handed out twice.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use progressivi::adapters::Deadline;
//! use progressivi::store::MemoryStore;
//!
//! let store = Deadline::new(MemoryStore::new(), Duration::from_millis(250));
//! assert_eq!(store.limit(), Duration::from_millis(250));
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::scope::ScopeKey;
use crate::store::{CounterRecord, CounterStore};

/// A [`CounterStore`] wrapper failing calls that exceed a deadline.
#[derive(Debug)]
pub struct Deadline<S> {
    inner: S,
    limit: Duration,
}

impl<S> Deadline<S> {
    /// Wraps `inner`, bounding each call by `limit`.
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// Returns the per-call limit.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Returns a reference to the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, limit = ?self.limit, "counter store call timed out");
                Err(StoreError::Timeout(self.limit))
            }
        }
    }
}

#[async_trait]
impl<S: CounterStore> CounterStore for Deadline<S> {
    async fn fetch_increment(&self, key: &ScopeKey) -> StoreResult<u64> {
        self.bounded("fetch_increment", self.inner.fetch_increment(key))
            .await
    }

    async fn current(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        self.bounded("current", self.inner.current(key)).await
    }

    async fn records(&self) -> StoreResult<Vec<CounterRecord>> {
        self.bounded("records", self.inner.records()).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

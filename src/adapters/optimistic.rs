//! Optimistic allocation over compare-and-swap stores.
//!
//! [`Optimistic`] turns any [`VersionedStore`] into a [`CounterStore`] by
//! running a read / compare-and-swap loop:
//!
//! ```text
//!   loop:
//!     current = load(key)              (None → record missing)
//!     next    = current.unwrap_or(0) + 1
//!     if compare_and_swap(key, current, next): return next
//!     back off, retry
//! ```
//!
//! A failed swap writes nothing, so losing a race never produces a partial
//! update: the loser simply reads the winner's value and tries again. The
//! winner of each round is the only caller that observes `current`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use progressivi::adapters::{Optimistic, RetryPolicy};
//! use progressivi::scope::ScopeKey;
//! use progressivi::store::{CounterStore, MemoryStore};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let store = Optimistic::new(MemoryStore::new()).with_policy(RetryPolicy::default());
//! let key = ScopeKey::from_raw("employee");
//!
//! assert_eq!(store.fetch_increment(&key).await.unwrap(), 1);
//! assert_eq!(store.fetch_increment(&key).await.unwrap(), 2);
//! # });
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::scope::ScopeKey;
use crate::store::{CounterRecord, CounterStore, VersionedStore};

/// Backoff and retry budget for compare-and-swap loops.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    /// Total compare-and-swap attempts before giving up.
    pub max_attempts: u32,
    /// Delay after the first lost race, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubling delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff_ms: 1,
            max_backoff_ms: 64,
        }
    }
}

impl RetryPolicy {
    /// Sets the attempt budget. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the initial and maximum backoff.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff_ms = initial.as_millis().try_into().unwrap_or(u64::MAX);
        self.max_backoff_ms = max.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Returns the delay to wait after the `attempt`-th lost race (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// A [`CounterStore`] built from a [`VersionedStore`] with retried
/// compare-and-swap.
#[derive(Debug)]
pub struct Optimistic<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Optimistic<S> {
    /// Wraps `inner` with the default [`RetryPolicy`].
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
        }
    }

    /// Sets the retry policy, returning `self` for method chaining.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns a reference to the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Consumes the adapter and returns the wrapped store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: VersionedStore> CounterStore for Optimistic<S> {
    async fn fetch_increment(&self, key: &ScopeKey) -> StoreResult<u64> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            let current = self.inner.load(key).await?;
            let next = current
                .unwrap_or(0)
                .checked_add(1)
                .ok_or_else(|| StoreError::Exhausted { key: key.clone() })?;

            if self.inner.compare_and_swap(key, current, next).await? {
                if attempt > 0 {
                    debug!(scope = %key, attempts = attempt + 1, "compare-and-swap won after retries");
                }
                return Ok(next);
            }

            attempt += 1;
            if attempt >= max_attempts {
                warn!(scope = %key, attempts = attempt, "compare-and-swap retry budget exhausted");
                return Err(StoreError::RetriesExhausted {
                    key: key.clone(),
                    attempts: attempt,
                });
            }
            tokio::time::sleep(self.policy.backoff(attempt)).await;
        }
    }

    async fn current(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        self.inner.load(key).await
    }

    async fn records(&self) -> StoreResult<Vec<CounterRecord>> {
        self.inner.scan().await
    }

    fn name(&self) -> &'static str {
        VersionedStore::name(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn key(s: &str) -> ScopeKey {
        ScopeKey::from_raw(s)
    }

    /// Loses the first `losses` swaps as if another writer got there first.
    struct Contended {
        inner: MemoryStore,
        losses: AtomicU32,
    }

    #[async_trait]
    impl VersionedStore for Contended {
        async fn load(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
            self.inner.load(key).await
        }

        async fn compare_and_swap(
            &self,
            key: &ScopeKey,
            expected: Option<u64>,
            new: u64,
        ) -> StoreResult<bool> {
            let lose = self
                .losses
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if lose {
                return Ok(false);
            }
            self.inner.compare_and_swap(key, expected, new).await
        }

        async fn scan(&self) -> StoreResult<Vec<CounterRecord>> {
            self.inner.scan().await
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1));
        assert_eq!(policy.backoff(2), Duration::from_millis(2));
        assert_eq!(policy.backoff(4), Duration::from_millis(8));
        assert_eq!(policy.backoff(7), Duration::from_millis(64));
        assert_eq!(policy.backoff(100), Duration::from_millis(64));
    }

    #[test]
    fn test_policy_builders() {
        let policy = RetryPolicy::default()
            .with_max_attempts(0)
            .with_backoff(Duration::from_millis(5), Duration::from_millis(20));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff(1), Duration::from_millis(5));
        assert_eq!(policy.backoff(3), Duration::from_millis(20));
    }

    #[test]
    fn test_huge_backoff_saturates() {
        let policy = RetryPolicy::default().with_backoff(Duration::MAX, Duration::MAX);
        assert_eq!(policy.initial_backoff_ms, u64::MAX);
        assert_eq!(policy.max_backoff_ms, u64::MAX);
    }

    #[tokio::test]
    async fn test_lazy_creation_and_increment() {
        let store = Optimistic::new(MemoryStore::new());
        assert_eq!(store.current(&key("customer")).await.unwrap(), None);
        assert_eq!(store.fetch_increment(&key("customer")).await.unwrap(), 1);
        assert_eq!(store.fetch_increment(&key("customer")).await.unwrap(), 2);
        assert_eq!(store.current(&key("customer")).await.unwrap(), Some(2));
        assert_eq!(CounterStore::name(&store), "memory");
    }

    #[tokio::test]
    async fn test_retries_after_lost_races() {
        let store = Optimistic::new(Contended {
            inner: MemoryStore::new(),
            losses: AtomicU32::new(3),
        });
        assert_eq!(store.fetch_increment(&key("employee")).await.unwrap(), 1);
        assert_eq!(store.fetch_increment(&key("employee")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let store = Optimistic::new(Contended {
            inner: MemoryStore::new(),
            losses: AtomicU32::new(u32::MAX),
        })
        .with_policy(RetryPolicy::default().with_max_attempts(3));

        let err = store.fetch_increment(&key("employee")).await.unwrap_err();
        assert!(matches!(err, StoreError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(store.current(&key("employee")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_exhausted_counter() {
        let store = Optimistic::new(MemoryStore::with_records([CounterRecord::new(
            key("customer"),
            u64::MAX,
        )]));
        let err = store.fetch_increment(&key("customer")).await.unwrap_err();
        assert!(matches!(err, StoreError::Exhausted { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_contiguous() {
        let store = Arc::new(
            Optimistic::new(MemoryStore::new())
                .with_policy(RetryPolicy::default().with_max_attempts(1_000)),
        );
        let mut handles = vec![];

        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut seen = vec![];
                for _ in 0..50 {
                    seen.push(store.fetch_increment(&key("inventory:WH-01")).await.unwrap());
                }
                seen
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for value in handle.await.unwrap() {
                assert!(all.insert(value), "duplicate value {value}");
            }
        }
        assert_eq!(all, (1..=400).collect::<HashSet<u64>>());
    }
}

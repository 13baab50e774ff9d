//! Fault-injecting store used by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::scope::ScopeKey;
use crate::store::{CounterRecord, CounterStore, MemoryStore};

/// A [`MemoryStore`] that can be switched offline or slowed down.
///
/// While offline every operation fails with [`StoreError::Unavailable`]
/// before touching the inner store.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    offline: AtomicBool,
    fail_next: AtomicUsize,
    delay: Option<Duration>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delays every operation by `delay` before running it.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fails the next `count` operations, then recovers.
    pub(crate) fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    async fn check(&self) -> StoreResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        let pending = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for FlakyStore {
    async fn fetch_increment(&self, key: &ScopeKey) -> StoreResult<u64> {
        self.check().await?;
        self.inner.fetch_increment(key).await
    }

    async fn current(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        self.check().await?;
        CounterStore::current(&self.inner, key).await
    }

    async fn records(&self) -> StoreResult<Vec<CounterRecord>> {
        self.check().await?;
        self.inner.records().await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

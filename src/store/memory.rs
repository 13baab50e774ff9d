//! In-process counter store with sharded storage.
//!
//! [`MemoryStore`] keeps counter records in memory, spread over 64 shards.
//! Each shard is a `RwLock<HashMap<ScopeKey, AtomicU64>>` wrapped in
//! [`crossbeam_utils::CachePadded`] so that shards never share a cache line.
//!
//! ```text
//!                      hash(scope_key) % 64
//!                              │
//!        ┌─────────────────────┼──────────────────────────┐
//!        ▼                     ▼                          ▼
//!   [Shard 0] RwLock     [Shard 1] RwLock   ...    [Shard 63] RwLock
//!   { key → AtomicU64 }  { key → AtomicU64 }       { key → AtomicU64 }
//! ```
//!
//! # Concurrency
//!
//! - Incrementing an existing record only takes the shard's *read* lock; the
//!   increment itself is an atomic `fetch_update`, so concurrent increments
//!   of one key never observe the same previous value.
//! - The shard's *write* lock is taken only the first time a key is seen, to
//!   insert the record. The insert and the first increment happen under that
//!   same lock.
//! - Keys in different shards never touch the same lock.
//!
//! The store is not durable: records live as long as the process. Use it for
//! tests, single-process deployments, or as the compare-and-swap target of
//! [`Optimistic`](crate::adapters::Optimistic).

use std::collections::hash_map::{Entry, RandomState};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use crossbeam_utils::CachePadded;

use crate::error::{StoreError, StoreResult};
use crate::scope::ScopeKey;
use crate::store::{CounterRecord, CounterStore, VersionedStore};

/// Number of shards used by each store.
///
/// Each shard is cache-line padded, so an empty store costs roughly
/// `64 shards × 128 bytes` on top of its maps.
pub(crate) const NUM_SHARDS: usize = 64;

type Shard = CachePadded<RwLock<HashMap<ScopeKey, AtomicU64>>>;

/// A sharded, in-memory counter store.
///
/// # Examples
///
/// ```rust
/// use progressivi::scope::ScopeKey;
/// use progressivi::store::{CounterStore, MemoryStore};
///
/// # tokio_test_block_on(async {
/// let store = MemoryStore::new();
/// let key = ScopeKey::from_raw("customer");
///
/// assert_eq!(store.fetch_increment(&key).await.unwrap(), 1);
/// assert_eq!(store.fetch_increment(&key).await.unwrap(), 2);
/// assert_eq!(store.current(&key).await.unwrap(), Some(2));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct MemoryStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS)
            .map(|_| CachePadded::new(RwLock::new(HashMap::new())))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Creates a store pre-populated with `records`.
    ///
    /// Later records win when a scope key appears more than once.
    pub fn with_records(records: impl IntoIterator<Item = CounterRecord>) -> Self {
        let store = Self::new();
        for record in records {
            if let Ok(mut shard) = store.shard(&record.scope_key).write() {
                shard.insert(record.scope_key, AtomicU64::new(record.sequence_value));
            }
        }
        store
    }

    /// Returns the number of counter records.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().map(|map| map.len()).unwrap_or(0))
            .sum()
    }

    /// Returns `true` if no scope was ever allocated from.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard(&self, key: &ScopeKey) -> &RwLock<HashMap<ScopeKey, AtomicU64>> {
        let index = self.hasher.hash_one(key) as usize % NUM_SHARDS;
        &self.shards[index]
    }

    fn read(&self, key: &ScopeKey) -> StoreResult<RwLockReadGuard<'_, HashMap<ScopeKey, AtomicU64>>> {
        self.shard(key)
            .read()
            .map_err(|_| StoreError::Unavailable(format!("shard for {key} is poisoned")))
    }

    fn write(
        &self,
        key: &ScopeKey,
    ) -> StoreResult<RwLockWriteGuard<'_, HashMap<ScopeKey, AtomicU64>>> {
        self.shard(key)
            .write()
            .map_err(|_| StoreError::Unavailable(format!("shard for {key} is poisoned")))
    }

    fn collect(&self) -> StoreResult<Vec<CounterRecord>> {
        let mut records = Vec::new();
        for shard in self.shards.iter() {
            let map = shard
                .read()
                .map_err(|_| StoreError::Unavailable("shard is poisoned".to_string()))?;
            records.extend(
                map.iter()
                    .map(|(key, value)| CounterRecord::new(key.clone(), value.load(Ordering::Acquire))),
            );
        }
        records.sort();
        Ok(records)
    }
}

/// Increments `counter` by one unless it is already at `u64::MAX`.
fn increment(key: &ScopeKey, counter: &AtomicU64) -> StoreResult<u64> {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_add(1))
        .map(|previous| previous + 1)
        .map_err(|_| StoreError::Exhausted { key: key.clone() })
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn fetch_increment(&self, key: &ScopeKey) -> StoreResult<u64> {
        {
            let map = self.read(key)?;
            if let Some(counter) = map.get(key) {
                return increment(key, counter);
            }
        }

        // First use of this key: insert and increment under the write lock.
        // Another task may have inserted it since the read lock was released.
        let mut map = self.write(key)?;
        let counter = map.entry(key.clone()).or_insert_with(|| AtomicU64::new(0));
        increment(key, counter)
    }

    async fn current(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        let map = self.read(key)?;
        Ok(map.get(key).map(|counter| counter.load(Ordering::Acquire)))
    }

    async fn records(&self) -> StoreResult<Vec<CounterRecord>> {
        self.collect()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl VersionedStore for MemoryStore {
    async fn load(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        let map = self.read(key)?;
        Ok(map.get(key).map(|counter| counter.load(Ordering::Acquire)))
    }

    async fn compare_and_swap(
        &self,
        key: &ScopeKey,
        expected: Option<u64>,
        new: u64,
    ) -> StoreResult<bool> {
        match expected {
            Some(expected) => {
                let map = self.read(key)?;
                Ok(map.get(key).is_some_and(|counter| {
                    counter
                        .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                }))
            }
            None => {
                let mut map = self.write(key)?;
                match map.entry(key.clone()) {
                    Entry::Occupied(_) => Ok(false),
                    Entry::Vacant(slot) => {
                        slot.insert(AtomicU64::new(new));
                        Ok(true)
                    }
                }
            }
        }
    }

    async fn scan(&self) -> StoreResult<Vec<CounterRecord>> {
        self.collect()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MemoryStore {
    /// Formats the store showing every record.
    ///
    /// Output format: `MemoryStore{ key:value key:value ... }`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryStore{{")?;
        for record in self.collect().unwrap_or_default() {
            write!(f, " {}:{}", record.scope_key, record.sequence_value)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn key(s: &str) -> ScopeKey {
        ScopeKey::from_raw(s)
    }

    #[tokio::test]
    async fn test_first_increment_returns_one() {
        let store = MemoryStore::new();
        assert_eq!(CounterStore::current(&store, &key("customer")).await.unwrap(), None);
        assert_eq!(store.fetch_increment(&key("customer")).await.unwrap(), 1);
        assert_eq!(CounterStore::current(&store, &key("customer")).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_sequential_increments() {
        let store = MemoryStore::new();
        for expected in 1..=50 {
            assert_eq!(store.fetch_increment(&key("employee")).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryStore::new();
        store.fetch_increment(&key("brand:Sindh:Karachi")).await.unwrap();
        store.fetch_increment(&key("brand:Sindh:Karachi")).await.unwrap();
        assert_eq!(store.fetch_increment(&key("brand:Punjab:Lahore")).await.unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_unique() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut seen = vec![];
                for _ in 0..250 {
                    seen.push(store.fetch_increment(&key("customer")).await.unwrap());
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
        assert_eq!(all, (1..=2000).collect::<HashSet<u64>>());
    }

    #[test]
    fn test_concurrent_first_use_from_threads() {
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                    rt.block_on(store.fetch_increment(&key("inventory:WH-01"))).unwrap()
                })
            })
            .collect();

        let values: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(values, (1..=16).collect::<HashSet<u64>>());
    }

    #[tokio::test]
    async fn test_exhausted_counter_is_unchanged() {
        let store = MemoryStore::with_records([CounterRecord::new(key("customer"), u64::MAX)]);
        let err = store.fetch_increment(&key("customer")).await.unwrap_err();
        assert!(matches!(err, StoreError::Exhausted { .. }));
        assert_eq!(CounterStore::current(&store, &key("customer")).await.unwrap(), Some(u64::MAX));
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = MemoryStore::new();
        let k = key("employee");

        assert!(!store.compare_and_swap(&k, Some(0), 1).await.unwrap());
        assert!(store.compare_and_swap(&k, None, 1).await.unwrap());
        assert!(!store.compare_and_swap(&k, None, 1).await.unwrap());
        assert!(!store.compare_and_swap(&k, Some(0), 2).await.unwrap());
        assert!(store.compare_and_swap(&k, Some(1), 2).await.unwrap());
        assert_eq!(store.load(&k).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_records_sorted() {
        let store = MemoryStore::new();
        store.fetch_increment(&key("employee")).await.unwrap();
        store.fetch_increment(&key("brand:Sindh:Karachi")).await.unwrap();
        store.fetch_increment(&key("brand:Sindh:Karachi")).await.unwrap();

        let records = store.records().await.unwrap();
        assert_eq!(
            records,
            vec![
                CounterRecord::new(key("brand:Sindh:Karachi"), 2),
                CounterRecord::new(key("employee"), 1),
            ]
        );
        assert_eq!(store.scan().await.unwrap(), records);
    }

    #[test]
    fn test_debug() {
        let store = MemoryStore::with_records([CounterRecord::new(key("customer"), 7)]);
        assert_eq!(format!("{store:?}"), "MemoryStore{ customer:7 }");
    }

    #[test]
    fn test_default_is_empty() {
        let store = MemoryStore::default();
        assert!(store.is_empty());
    }
}

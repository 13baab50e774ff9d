//! Serializable point-in-time captures of a counter store.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature:
//!
//! ```toml
//! [dependencies]
//! progressivi = { version = "0.1", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use progressivi::scope::ScopeKey;
//! use progressivi::snapshot::StoreSnapshot;
//! use progressivi::store::CounterRecord;
//!
//! let snapshot = StoreSnapshot::with_timestamp(
//!     vec![CounterRecord::new(ScopeKey::from_raw("customer"), 42)],
//!     1_700_000_000_000,
//! );
//! assert_eq!(snapshot.get("customer").map(|r| r.sequence_value), Some(42));
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::store::{CounterRecord, CounterStore};

/// Every counter record of a store at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Optional capture time in milliseconds since Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    /// The counter records, sorted by scope key.
    pub counters: Vec<CounterRecord>,
}

impl StoreSnapshot {
    /// Creates a snapshot of the given records.
    pub fn new(mut counters: Vec<CounterRecord>) -> Self {
        counters.sort();
        Self {
            timestamp_ms: None,
            counters,
        }
    }

    /// Creates a snapshot of the given records taken at `timestamp_ms`.
    pub fn with_timestamp(counters: Vec<CounterRecord>, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            ..Self::new(counters)
        }
    }

    /// Reads every record of `store`, stamped with the current time.
    pub async fn capture<S: CounterStore + ?Sized>(store: &S) -> StoreResult<Self> {
        let counters = store.records().await?;
        Ok(match now_ms() {
            Some(timestamp_ms) => Self::with_timestamp(counters, timestamp_ms),
            None => Self::new(counters),
        })
    }

    /// Finds the record of a scope key.
    pub fn get(&self, scope_key: &str) -> Option<&CounterRecord> {
        self.counters
            .iter()
            .find(|record| record.scope_key.as_str() == scope_key)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns `true` if the snapshot holds no record.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// Milliseconds since Unix epoch, `None` if the clock is before it.
pub(crate) fn now_ms() -> Option<u64> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(elapsed.as_millis()).ok()
}

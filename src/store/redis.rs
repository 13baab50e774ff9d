//! Redis-backed counter store.
//!
//! All counters live in a single Redis hash: the field is the scope key and
//! the value is the last allocated sequence number. Allocation is one
//! `HINCRBY <hash> <scope> 1`, which Redis executes atomically and which
//! creates a missing field at 0 before incrementing it. Hash field names are
//! unique, so there is at most one record per scope.
//!
//! ```text
//! progressivi:counters
//!   ├── brand:Sindh:Karachi   → 3
//!   ├── customer              → 1542
//!   ├── employee              → 87
//!   └── inventory:WH-01       → 12
//! ```
//!
//! # Feature Flag
//!
//! This module requires the `redis` feature:
//!
//! ```toml
//! [dependencies]
//! progressivi = { version = "0.1", features = ["redis"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use progressivi::store::RedisStore;
//!
//! let store = RedisStore::connect("redis://127.0.0.1/").await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::scope::ScopeKey;
use crate::store::{CounterRecord, CounterStore};

/// Name of the hash holding every counter unless configured otherwise.
pub const DEFAULT_HASH_KEY: &str = "progressivi:counters";

/// A counter store persisting records in one Redis hash.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    hash_key: String,
}

impl RedisStore {
    /// Connects to the Redis server at `url`, using [`DEFAULT_HASH_KEY`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(url, hash_key = DEFAULT_HASH_KEY, "connected to redis counter store");
        Ok(Self::with_connection(conn))
    }

    /// Wraps an existing connection manager.
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            hash_key: DEFAULT_HASH_KEY.to_string(),
        }
    }

    /// Sets the name of the hash holding the counters.
    pub fn with_hash_key(mut self, hash_key: impl Into<String>) -> Self {
        self.hash_key = hash_key.into();
        self
    }

    /// Returns the name of the hash holding the counters.
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }
}

/// Converts a stored integer into a sequence value.
fn sequence_value(key: &ScopeKey, raw: i64) -> StoreResult<u64> {
    u64::try_from(raw).map_err(|_| StoreError::Corrupted {
        key: key.clone(),
        reason: format!("negative counter value {raw}"),
    })
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn fetch_increment(&self, key: &ScopeKey) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.hincr(&self.hash_key, key.as_str(), 1).await?;
        sequence_value(key, value)
    }

    async fn current(&self, key: &ScopeKey) -> StoreResult<Option<u64>> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.hget(&self.hash_key, key.as_str()).await?;
        value.map(|v| sequence_value(key, v)).transpose()
    }

    async fn records(&self) -> StoreResult<Vec<CounterRecord>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, i64> = conn.hgetall(&self.hash_key).await?;
        let mut records = fields
            .into_iter()
            .map(|(field, value)| {
                let key = ScopeKey::from_raw(field);
                sequence_value(&key, value).map(|v| CounterRecord::new(key, v))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        records.sort();
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

//! Sequencer configuration.
//!
//! A [`SequencerConfig`] bundles the identifier layouts ([`FormatConfig`]) and
//! the counter store stack ([`StoreConfig`]). Every struct has a `Default`
//! and builder methods; with the `serde` feature they also deserialize, and
//! the `json` feature adds [`SequencerConfig::from_json_str`].
//!
//! ```json
//! {
//!   "format": {
//!     "brand": { "prefix": "BR", "width": 4 },
//!     "city_codes": { "Mirpur Khas": "MPK" }
//!   },
//!   "store": {
//!     "backend": { "kind": "redis", "url": "redis://127.0.0.1/" },
//!     "timeout_ms": 500
//!   }
//! }
//! ```
//!
//! [`StoreConfig::open`] assembles the configured stack, innermost first:
//!
//! ```text
//!   backend (memory | memory_cas → Optimistic | redis) ──► Deadline (if timeout_ms)
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::adapters::{Deadline, Optimistic, RetryPolicy};
use crate::error::{StoreError, StoreResult};
use crate::format::FormatConfig;
use crate::sequencer::Sequencer;
use crate::store::{CounterStore, MemoryStore};

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for a [`SequencerConfig`].
    #[cfg(feature = "json")]
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but holds inconsistent values.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configured store could not be opened.
    #[error("failed to open counter store: {0}")]
    Store(#[from] StoreError),
}

/// Counter store backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Backend {
    /// In-process [`MemoryStore`] using its atomic increment.
    #[default]
    Memory,
    /// In-process [`MemoryStore`] driven through compare-and-swap retries.
    MemoryCas,
    /// [`RedisStore`](crate::store::RedisStore); requires the `redis` feature.
    Redis {
        /// Connection URL, e.g. `redis://127.0.0.1/`.
        url: String,
        /// Hash holding the counters, the store default if `None`.
        #[cfg_attr(feature = "serde", serde(default))]
        hash_key: Option<String>,
    },
}

impl Backend {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::MemoryCas => "memory_cas",
            Backend::Redis { .. } => "redis",
        }
    }
}

/// Counter store stack configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    /// The backend holding the counters.
    pub backend: Backend,
    /// Per-call deadline in milliseconds, none if `None`.
    pub timeout_ms: Option<u64>,
    /// Retry budget of compare-and-swap backends.
    pub retry: RetryPolicy,
}

impl StoreConfig {
    /// Sets the backend, returning `self` for method chaining.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Bounds every store call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Sets the retry policy of compare-and-swap backends.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the per-call deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Checks the values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("store timeout_ms must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry max_attempts must be positive".into()));
        }
        if let Backend::Redis { url, .. } = &self.backend {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid("redis url must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Validates the configuration and opens the configured store stack.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if [`validate`](Self::validate) fails,
    /// or [`ConfigError::Store`] if the backend cannot be reached
    /// ([`StoreError::Unavailable`] for a Redis backend without the `redis`
    /// feature).
    pub async fn open(&self) -> Result<Arc<dyn CounterStore>, ConfigError> {
        self.validate()?;
        let timeout = self.timeout();
        let store = match &self.backend {
            Backend::Memory => bounded(MemoryStore::new(), timeout),
            Backend::MemoryCas => bounded(
                Optimistic::new(MemoryStore::new()).with_policy(self.retry.clone()),
                timeout,
            ),
            Backend::Redis { url, hash_key } => open_redis(url, hash_key.as_deref(), timeout).await?,
        };
        info!(backend = self.backend.name(), ?timeout, "opened counter store");
        Ok(store)
    }
}

fn bounded<S: CounterStore + 'static>(store: S, timeout: Option<Duration>) -> Arc<dyn CounterStore> {
    match timeout {
        Some(limit) => Arc::new(Deadline::new(store, limit)),
        None => Arc::new(store),
    }
}

#[cfg(feature = "redis")]
async fn open_redis(
    url: &str,
    hash_key: Option<&str>,
    timeout: Option<Duration>,
) -> StoreResult<Arc<dyn CounterStore>> {
    let mut store = crate::store::RedisStore::connect(url).await?;
    if let Some(hash_key) = hash_key {
        store = store.with_hash_key(hash_key);
    }
    Ok(bounded(store, timeout))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(
    _url: &str,
    _hash_key: Option<&str>,
    _timeout: Option<Duration>,
) -> StoreResult<Arc<dyn CounterStore>> {
    Err(StoreError::Unavailable(
        "redis backend requires the `redis` feature".into(),
    ))
}

/// Complete sequencer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SequencerConfig {
    /// Identifier layouts.
    pub format: FormatConfig,
    /// Counter store stack.
    pub store: StoreConfig,
}

impl SequencerConfig {
    /// Parses and validates a JSON document.
    ///
    /// Missing fields take their defaults.
    #[cfg(feature = "json")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.format.validate()?;
        self.store.validate()
    }

    /// Validates the configuration, opens the store stack and builds a
    /// sequencer over it.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate) and [`StoreConfig::open`].
    pub async fn open(&self) -> Result<Sequencer<dyn CounterStore>, ConfigError> {
        self.format.validate()?;
        let store = self.store.open().await?;
        Ok(Sequencer::with_config(store, self.format.clone()))
    }
}

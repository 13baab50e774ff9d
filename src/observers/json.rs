//! JSON observer for serializing counter records.
//!
//! This module provides [`JsonObserver`], which serializes [`CounterRecord`]s
//! to JSON using serde, either as a bare array or wrapped in a
//! [`StoreSnapshot`].
//!
//! # Feature Flag
//!
//! This module requires the `json` feature:
//!
//! ```toml
//! [dependencies]
//! progressivi = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use progressivi::observers::json::JsonObserver;
//! use progressivi::scope::ScopeKey;
//! use progressivi::store::CounterRecord;
//!
//! let records = vec![
//!     CounterRecord::new(ScopeKey::from_raw("brand:Sindh:Karachi"), 3),
//!     CounterRecord::new(ScopeKey::from_raw("customer"), 42),
//! ];
//!
//! let json = JsonObserver::new().to_json(&records).unwrap();
//! assert_eq!(
//!     json,
//!     r#"[{"scope_key":"brand:Sindh:Karachi","sequence_value":3},{"scope_key":"customer","sequence_value":42}]"#
//! );
//! ```

use super::Result;
use crate::snapshot::{now_ms, StoreSnapshot};
use crate::store::CounterRecord;

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Whether to pretty-print the JSON output.
    pub pretty: bool,
    /// Whether to include a timestamp in the output.
    pub include_timestamp: bool,
    /// Whether to wrap records in a [`StoreSnapshot`] object.
    pub wrap_in_snapshot: bool,
}

/// An observer that serializes counter records to JSON.
///
/// Pretty-printed snapshot with a timestamp:
///
/// ```rust
/// use progressivi::observers::json::JsonObserver;
///
/// let observer = JsonObserver::new()
///     .pretty(true)
///     .wrap_in_snapshot(true)
///     .include_timestamp(true);
/// let json = observer.to_json(&[]).unwrap();
/// assert!(json.contains("timestamp_ms"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    /// Creates a new JSON observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new JSON observer with the specified configuration.
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables or disables pretty-printing.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    /// Enables or disables timestamp inclusion.
    ///
    /// Only has effect when `wrap_in_snapshot` is also enabled.
    pub fn include_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Enables or disables wrapping the output in a [`StoreSnapshot`].
    pub fn wrap_in_snapshot(mut self, enabled: bool) -> Self {
        self.config.wrap_in_snapshot = enabled;
        self
    }

    /// Serializes `records` to a JSON string.
    pub fn to_json(&self, records: &[CounterRecord]) -> Result<String> {
        let json = if self.config.wrap_in_snapshot {
            let snapshot = self.snapshot(records);
            if self.config.pretty {
                serde_json::to_string_pretty(&snapshot)?
            } else {
                serde_json::to_string(&snapshot)?
            }
        } else if self.config.pretty {
            serde_json::to_string_pretty(records)?
        } else {
            serde_json::to_string(records)?
        };
        Ok(json)
    }

    /// Serializes `records` to a JSON byte vector.
    pub fn to_json_bytes(&self, records: &[CounterRecord]) -> Result<Vec<u8>> {
        let bytes = if self.config.wrap_in_snapshot {
            serde_json::to_vec(&self.snapshot(records))?
        } else {
            serde_json::to_vec(records)?
        };
        Ok(bytes)
    }

    fn snapshot(&self, records: &[CounterRecord]) -> StoreSnapshot {
        if self.config.include_timestamp {
            StoreSnapshot::with_timestamp(records.to_vec(), now_ms().unwrap_or(0))
        } else {
            StoreSnapshot::new(records.to_vec())
        }
    }
}

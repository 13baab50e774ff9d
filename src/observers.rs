//! Observer implementations for inspecting and exporting counter records.
//!
//! - [`table`] - Pretty-print records as tables using the `tabled` crate
//! - [`json`] - Serialize records to JSON format
//! - [`prometheus`] - Export records in Prometheus exposition format
//!
//! Every observer renders a slice of [`CounterRecord`](crate::store::CounterRecord)s,
//! typically obtained from [`Sequencer::records`](crate::sequencer::Sequencer::records)
//! or [`CounterStore::records`](crate::store::CounterStore::records).
//!
//! # Unified Error Handling
//!
//! All observers use a unified [`ObserverError`] type, allowing you to switch
//! between observers without changing error handling code.
//!
//! # Feature Flags
//!
//! Each observer is gated behind a feature flag to minimize dependencies:
//!
//! - `table` - Enables the [`table`] module
//! - `json` - Enables the [`json`] module
//! - `prometheus` - Enables the [`prometheus`] module
//! - `full` - Enables all observer modules
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use progressivi::observers::Result;
//! use progressivi::scope::{CounterKind, ScopeContext};
//! use progressivi::sequencer::Sequencer;
//! use progressivi::store::MemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let sequencer = Sequencer::new(Arc::new(MemoryStore::new()));
//! sequencer.next_identifier(CounterKind::Customer, &ScopeContext::global()).await.unwrap();
//! let records = sequencer.records().await.unwrap();
//!
//! let export = || -> Result<()> {
//!     #[cfg(feature = "prometheus")]
//!     {
//!         use progressivi::observers::prometheus::PrometheusObserver;
//!         println!("{}", PrometheusObserver::new().render(&records)?);
//!     }
//!
//!     #[cfg(feature = "json")]
//!     {
//!         use progressivi::observers::json::JsonObserver;
//!         println!("{}", JsonObserver::new().to_json(&records)?);
//!     }
//!
//!     Ok(())
//! };
//! export().unwrap();
//! # });
//! ```

mod error;

pub use error::{ObserverError, Result};

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "prometheus")]
pub mod prometheus;

//! # Progressivi - Scoped, Collision-Free Sequence Identifiers
//!
//! A Rust library issuing short, sequential, human-readable identifiers such as
//! `SDKHI-0003` or `CUS-00042`. Identifiers never collide, even when many
//! creation requests race, and numbering can be scoped by business keys (for
//! example per province and city) instead of being one global sequence.
//!
//! ## The Problem
//!
//! The naive way to number entities is to read the highest number in use and
//! write back that number plus one. Two concurrent requests can read the same
//! value, and both then issue the same identifier.
//!
//! ## The Solution: Atomic Counters per Scope
//!
//! Every scope owns one counter record in a [`CounterStore`](store::CounterStore).
//! Allocating a number is a single indivisible **fetch-and-increment** that
//! also creates the record on first use. Correctness is delegated entirely to
//! the store: there is no in-process lock spanning scopes and no module-level
//! counter state.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  kind + ScopeContext                                                     │
//! │        │                                                                 │
//! │        ▼                                                                 │
//! │  scope::resolve ──► ScopeKey "brand:Sindh:Karachi"          (pure)       │
//! │        │                                                                 │
//! │        ▼                                                                 │
//! │  Allocator::allocate ──► CounterStore::fetch_increment ──► 3 (atomic)    │
//! │        │                                                                 │
//! │        ▼                                                                 │
//! │  Formatter::format ──► "SDKHI-0003"                         (pure)       │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Guarantees
//!
//! 1. **Uniqueness**: N concurrent allocations on one scope return N
//!    distinct values.
//! 2. **Contiguity**: those values are exactly `prev+1 ..= prev+N`.
//! 3. **Lazy creation**: the first allocation on an unseen scope returns 1.
//! 4. **Scope independence**: scopes never share a counter or contend on a lock.
//! 5. **Failure atomicity**: a failed allocation leaves the counter untouched.
//!
//! Gaps are possible (a timed-out remote increment, a format overflow), duplicates
//! are not.
//!
//! ## Counter Kinds
//!
//! | Kind | Scope key | Default identifier |
//! |------|-----------|--------------------|
//! | [`Brand`](scope::CounterKind::Brand) | `brand:<province>:<city>` | `SDKHI-0003` |
//! | [`Customer`](scope::CounterKind::Customer) | `customer` | `CUS-00042` |
//! | [`Employee`](scope::CounterKind::Employee) | `employee` | `EMP-0007` |
//! | [`Inventory`](scope::CounterKind::Inventory) | `inventory:<key>` | `INV-WH-01-00012` |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use progressivi::scope::{CounterKind, ScopeContext};
//! use progressivi::sequencer::Sequencer;
//! use progressivi::store::MemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! // Share one sequencer across tasks
//! let sequencer = Sequencer::new(Arc::new(MemoryStore::new()));
//!
//! let karachi = ScopeContext::geo("Sindh", "Karachi");
//! assert_eq!(sequencer.next_identifier(CounterKind::Brand, &karachi).await.unwrap(), "SDKHI-0001");
//! assert_eq!(sequencer.next_identifier(CounterKind::Brand, &karachi).await.unwrap(), "SDKHI-0002");
//!
//! // Other scopes count independently
//! let lahore = ScopeContext::geo("Punjab", "Lahore");
//! assert_eq!(sequencer.next_identifier(CounterKind::Brand, &lahore).await.unwrap(), "PBLHE-0001");
//! # });
//! ```
//!
//! ## Stores
//!
//! | Store | Description |
//! |-------|-------------|
//! | [`MemoryStore`](store::MemoryStore) | Sharded in-process store, 64 cache-padded shards |
//! | `RedisStore` | One Redis hash, `HINCRBY` per allocation (feature `redis`) |
//! | [`Optimistic`](adapters::Optimistic) | Any [`VersionedStore`](store::VersionedStore) driven by compare-and-swap retries |
//! | [`Deadline`](adapters::Deadline) | Per-call timeout around any store |
//!
//! Stacks can be assembled from a [`SequencerConfig`](config::SequencerConfig).
//!
//! ## Observers
//!
//! The library provides optional observer modules for exporting counter
//! records. Each observer is gated behind a feature flag:
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `table` | `observers::table` | Pretty-print records as ASCII tables |
//! | `json` | `observers::json` | Serialize records to JSON |
//! | `prometheus` | `observers::prometheus` | Export in Prometheus exposition format |
//! | `full` | All observers | Enables all observer modules and the Redis store |
//!
//! ### Example: Table Output
//!
//! ```toml
//! [dependencies]
//! progressivi = { version = "0.1", features = ["table"] }
//! ```
//!
//! ```rust,ignore
//! use progressivi::observers::table::TableObserver;
//!
//! let records = sequencer.records().await?;
//! println!("{}", TableObserver::new().render(&records));
//! ```

pub mod adapters;
pub mod allocator;
pub mod config;
pub mod error;
pub mod format;
pub mod observers;
pub mod scope;
pub mod sequencer;
pub mod store;

#[cfg(feature = "serde")]
pub mod snapshot;

pub use error::{SequenceError, StoreError};
pub use scope::{CounterKind, ScopeContext, ScopeKey};
pub use sequencer::{Identifier, Sequencer};

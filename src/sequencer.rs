//! The next-identifier operation.
//!
//! A [`Sequencer`] composes the scope resolver, the [`Allocator`] and the
//! [`Formatter`]:
//!
//! ```text
//!   kind + context ──► resolve ──► ScopeKey ──► allocate ──► n ──► format ──► "SDKHI-0003"
//!                     (no I/O)                 (store op)         (pure)
//! ```
//!
//! The scope is resolved before the store is touched, so an invalid context
//! never mutates a counter. Formatting happens after allocation: when it
//! fails with [`SequenceError::FormatOverflow`] the allocated number is
//! abandoned and the sequence shows a gap. Gaps are allowed, duplicates are
//! not, so callers must not retry after a success.

use std::fmt::{self, Display};
use std::sync::Arc;

use tracing::info;

use crate::allocator::Allocator;
use crate::error::{Result, SequenceError};
use crate::format::{FormatConfig, Formatter};
use crate::scope::{resolve, CounterKind, ScopeContext, ScopeKey};
use crate::store::{CounterRecord, CounterStore};

/// An issued identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identifier {
    /// Kind of the identified entity.
    pub kind: CounterKind,
    /// Scope the sequence value was allocated in.
    pub scope: ScopeKey,
    /// Allocated sequence value.
    pub sequence: u64,
    /// Formatted identifier, the value persisted on the entity.
    pub display: String,
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.display
    }
}

/// Issues identifiers for every [`CounterKind`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use progressivi::scope::{CounterKind, ScopeContext};
/// use progressivi::sequencer::Sequencer;
/// use progressivi::store::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let sequencer = Sequencer::new(Arc::new(MemoryStore::new()));
/// let karachi = ScopeContext::geo("Sindh", "Karachi");
///
/// let id = sequencer.next_identifier(CounterKind::Brand, &karachi).await.unwrap();
/// assert_eq!(id, "SDKHI-0001");
///
/// let customer = sequencer.allocate(CounterKind::Customer, &ScopeContext::global()).await.unwrap();
/// assert_eq!(customer.sequence, 1);
/// assert_eq!(customer.display, "CUS-00001");
/// # });
/// ```
pub struct Sequencer<S: ?Sized> {
    allocator: Allocator<S>,
    formatter: Formatter,
}

impl<S: CounterStore + ?Sized> Sequencer<S> {
    /// Creates a sequencer over `store` with the default identifier layouts.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, FormatConfig::default())
    }

    /// Creates a sequencer over `store` with the given identifier layouts.
    pub fn with_config(store: Arc<S>, format: FormatConfig) -> Self {
        Self {
            allocator: Allocator::new(store),
            formatter: Formatter::with_config(format),
        }
    }

    /// Returns the allocator.
    pub fn allocator(&self) -> &Allocator<S> {
        &self.allocator
    }

    /// Returns the formatter.
    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Issues the next identifier of `kind` in the scope selected by `context`.
    ///
    /// # Errors
    ///
    /// - [`SequenceError::InvalidScopeContext`] if `context` does not select a
    ///   valid scope, or names a province or city without a code. No counter
    ///   is touched.
    /// - [`SequenceError::StoreUnavailable`] if the store fails. No number was
    ///   allocated; the call may be retried.
    /// - [`SequenceError::FormatOverflow`] if the allocated number does not fit
    ///   the configured layout. The number is skipped.
    pub async fn next_identifier(&self, kind: CounterKind, context: &ScopeContext) -> Result<String> {
        self.allocate(kind, context).await.map(String::from)
    }

    /// Like [`next_identifier`](Self::next_identifier), returning the scope and
    /// sequence value alongside the formatted identifier.
    pub async fn allocate(&self, kind: CounterKind, context: &ScopeContext) -> Result<Identifier> {
        let scope = resolve(kind, context)?;
        self.formatter.check(kind, context)?;
        let sequence = self.allocator.allocate(&scope).await?;
        let formatted = self.formatter.format(kind, context, sequence)?;

        info!(%kind, scope = %scope, sequence, identifier = %formatted, "issued identifier");

        Ok(Identifier {
            kind,
            scope,
            sequence,
            display: formatted,
        })
    }

    /// Returns the last value allocated for `kind` in the scope selected by
    /// `context`, 0 if none was.
    pub async fn peek(&self, kind: CounterKind, context: &ScopeContext) -> Result<u64> {
        let scope = resolve(kind, context)?;
        self.allocator.current(&scope).await
    }

    /// Returns every counter record in the store.
    pub async fn records(&self) -> Result<Vec<CounterRecord>> {
        self.allocator.records().await
    }
}

impl<S: ?Sized> Clone for Sequencer<S> {
    fn clone(&self) -> Self {
        Self {
            allocator: self.allocator.clone(),
            formatter: self.formatter.clone(),
        }
    }
}

impl<S: ?Sized> fmt::Debug for Sequencer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

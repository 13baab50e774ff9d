//! Atomic allocation of sequence values.
//!
//! The [`Allocator`] is the only writer of counter records. Each call to
//! [`Allocator::allocate`] performs exactly one store fetch-and-increment, so
//! the guarantees are those of the store primitive:
//!
//! 1. **Uniqueness**: N concurrent calls for one scope return N distinct values.
//! 2. **Contiguity**: those values are exactly `prev+1 ..= prev+N`.
//! 3. **Lazy creation**: the first call for an unseen scope returns 1.
//! 4. **Scope independence**: scopes never share a counter or a lock.
//! 5. **Failure atomicity**: a failed call leaves the counter untouched.
//!
//! The allocator itself holds no counter state and can be shared freely
//! between tasks (wrap it in an `Arc`) or instantiated per request.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, SequenceError};
use crate::scope::ScopeKey;
use crate::store::{CounterRecord, CounterStore};

/// Allocates sequence values from a [`CounterStore`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use progressivi::allocator::Allocator;
/// use progressivi::scope::{resolve, CounterKind, ScopeContext};
/// use progressivi::store::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let allocator = Allocator::new(Arc::new(MemoryStore::new()));
/// let scope = resolve(CounterKind::Brand, &ScopeContext::geo("Sindh", "Karachi")).unwrap();
///
/// assert_eq!(allocator.allocate(&scope).await.unwrap(), 1);
/// assert_eq!(allocator.allocate(&scope).await.unwrap(), 2);
/// assert_eq!(allocator.current(&scope).await.unwrap(), 2);
/// # });
/// ```
pub struct Allocator<S: ?Sized> {
    store: Arc<S>,
}

impl<S: CounterStore + ?Sized> Allocator<S> {
    /// Creates an allocator over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Allocates the next value in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::StoreUnavailable`] if the store fails. In that
    /// case no value was allocated and the call may be retried.
    pub async fn allocate(&self, scope: &ScopeKey) -> Result<u64> {
        match self.store.fetch_increment(scope).await {
            Ok(value) => {
                debug_assert!(value >= 1, "allocated sequence values start at 1");
                debug!(scope = %scope, sequence = value, store = self.store.name(), "allocated sequence value");
                Ok(value)
            }
            Err(source) => {
                warn!(scope = %scope, store = self.store.name(), error = %source, "sequence allocation failed");
                Err(SequenceError::StoreUnavailable {
                    scope: scope.clone(),
                    source,
                })
            }
        }
    }

    /// Returns the last value allocated in `scope`, 0 if none was.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::StoreUnavailable`] if the store fails.
    pub async fn current(&self, scope: &ScopeKey) -> Result<u64> {
        self.store
            .current(scope)
            .await
            .map(|value| value.unwrap_or(0))
            .map_err(|source| SequenceError::StoreUnavailable {
                scope: scope.clone(),
                source,
            })
    }

    /// Returns every counter record in the store.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::StoreUnavailable`] with scope `*` if the
    /// store fails.
    pub async fn records(&self) -> Result<Vec<CounterRecord>> {
        self.store
            .records()
            .await
            .map_err(|source| SequenceError::StoreUnavailable {
                scope: ScopeKey::from_raw("*"),
                source,
            })
    }
}

impl<S: ?Sized> Clone for Allocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

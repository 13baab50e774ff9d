//! Scope resolution: from a counter kind and its context to a scope key.
//!
//! Every identifier is numbered inside a *scope*, an independent namespace
//! with its own counter. How a kind is scoped differs:
//!
//! | Kind | Scoped by | Scope key |
//! |------|-----------|-----------|
//! | [`CounterKind::Brand`] | province and city | `brand:<province>:<city>` |
//! | [`CounterKind::Customer`] | nothing (global) | `customer` |
//! | [`CounterKind::Employee`] | nothing (global) | `employee` |
//! | [`CounterKind::Inventory`] | caller-supplied key | `inventory:<key>` |
//!
//! Attribute values are trimmed and must not contain `:`, which keeps the key
//! layout unambiguous. Province and city names are compared the way the
//! formatter looks up their codes, ignoring case and repeated whitespace, and
//! keyed by their capitalised spelling: `sindh` and ` SINDH ` both resolve to
//! `Sindh`. Inventory keys are kept verbatim and are case-sensitive.
//!
//! # Examples
//!
//! ```rust
//! use progressivi::scope::{resolve, CounterKind, ScopeContext};
//!
//! let key = resolve(CounterKind::Brand, &ScopeContext::geo("Sindh", "Karachi")).unwrap();
//! assert_eq!(key.as_str(), "brand:Sindh:Karachi");
//!
//! let key = resolve(CounterKind::Customer, &ScopeContext::global()).unwrap();
//! assert_eq!(key.as_str(), "customer");
//! ```

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

use crate::error::SequenceError;

/// Longest accepted scoping attribute, in characters.
pub const MAX_ATTRIBUTE_LEN: usize = 64;

/// Separator between the components of a scope key.
const KEY_SEPARATOR: char = ':';

/// The entity kinds that receive sequential identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CounterKind {
    /// Brands, numbered per province and city.
    Brand,
    /// Customers, numbered globally.
    Customer,
    /// Employees, numbered globally.
    Employee,
    /// Inventory items, numbered per caller-supplied key.
    Inventory,
}

impl CounterKind {
    /// All counter kinds, in declaration order.
    pub const ALL: [CounterKind; 4] = [
        CounterKind::Brand,
        CounterKind::Customer,
        CounterKind::Employee,
        CounterKind::Inventory,
    ];

    /// Returns the lowercase name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Brand => "brand",
            CounterKind::Customer => "customer",
            CounterKind::Employee => "employee",
            CounterKind::Inventory => "inventory",
        }
    }
}

impl Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown counter kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown counter kind: {0:?}")]
pub struct ParseKindError(pub String);

impl FromStr for CounterKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CounterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

/// Contextual attributes a kind may be scoped by.
///
/// Only the attributes relevant to the requested kind are read; the others
/// are ignored.
///
/// # Examples
///
/// ```rust
/// use progressivi::scope::ScopeContext;
///
/// let ctx = ScopeContext::new()
///     .with_province("Punjab")
///     .with_city("Lahore");
/// assert_eq!(ctx.province(), Some("Punjab"));
///
/// let ctx = ScopeContext::keyed("WH-01");
/// assert_eq!(ctx.key(), Some("WH-01"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeContext {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    province: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    city: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    key: Option<String>,
}

impl ScopeContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty context, for globally scoped kinds.
    pub fn global() -> Self {
        Self::default()
    }

    /// A geographic context carrying a province and a city.
    pub fn geo(province: impl Into<String>, city: impl Into<String>) -> Self {
        Self::new().with_province(province).with_city(city)
    }

    /// A context carrying a caller-supplied scope key.
    pub fn keyed(key: impl Into<String>) -> Self {
        Self::new().with_key(key)
    }

    /// Sets the province, returning `self` for method chaining.
    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = Some(province.into());
        self
    }

    /// Sets the city, returning `self` for method chaining.
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Sets the caller-supplied key, returning `self` for method chaining.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Returns the province, if set.
    pub fn province(&self) -> Option<&str> {
        self.province.as_deref()
    }

    /// Returns the city, if set.
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// Returns the caller-supplied key, if set.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// The opaque key identifying one counter namespace in the store.
///
/// Scope keys are produced by [`resolve`]; stores only compare and persist
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ScopeKey(String);

impl ScopeKey {
    /// Wraps a key read back from a store.
    ///
    /// No validation is performed; keys for allocation should come from
    /// [`resolve`].
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the counter kind encoded in the key, if recognised.
    pub fn kind(&self) -> Option<CounterKind> {
        let head = self.0.split(KEY_SEPARATOR).next()?;
        head.parse().ok()
    }
}

impl Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScopeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a resolved scope is partitioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Numbered per province and city.
    Geo {
        /// Capitalised province name.
        province: String,
        /// Capitalised city name.
        city: String,
    },
    /// One counter shared by every entity of the kind.
    Global,
    /// Numbered per caller-supplied key.
    Keyed(String),
}

/// A fully resolved scope: the kind, its partition and the store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    /// The counter kind.
    pub kind: CounterKind,
    /// The partition the kind was scoped by.
    pub scope: Scope,
    /// The key under which the counter is stored.
    pub key: ScopeKey,
}

/// Resolves `kind` and `context` to a scope key.
///
/// This is a precondition check only; no I/O is performed.
///
/// # Errors
///
/// Returns [`SequenceError::InvalidScopeContext`] if an attribute required by
/// `kind` is missing or malformed.
pub fn resolve(kind: CounterKind, context: &ScopeContext) -> Result<ScopeKey, SequenceError> {
    resolve_scope(kind, context).map(|resolved| resolved.key)
}

/// Resolves `kind` and `context`, returning the partition alongside the key.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_scope(
    kind: CounterKind,
    context: &ScopeContext,
) -> Result<ResolvedScope, SequenceError> {
    let scope = match kind {
        CounterKind::Brand => Scope::Geo {
            province: place_name(attribute(kind, "province", context.province())?),
            city: place_name(attribute(kind, "city", context.city())?),
        },
        CounterKind::Customer | CounterKind::Employee => Scope::Global,
        CounterKind::Inventory => Scope::Keyed(attribute(kind, "key", context.key())?.to_string()),
    };

    let key = match &scope {
        Scope::Geo { province, city } => format!("{kind}{KEY_SEPARATOR}{province}{KEY_SEPARATOR}{city}"),
        Scope::Global => kind.as_str().to_string(),
        Scope::Keyed(key) => format!("{kind}{KEY_SEPARATOR}{key}"),
    };

    Ok(ResolvedScope {
        kind,
        scope,
        key: ScopeKey(key),
    })
}

/// Folds a place name for comparison: whitespace runs collapsed, lowercased.
pub(crate) fn fold_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Spells a place name as its folded form with every word capitalised.
fn place_name(name: &str) -> String {
    let mut spelled = String::with_capacity(name.len());
    let mut word_start = true;
    for c in fold_name(name).chars() {
        let upper = c.to_uppercase();
        if word_start && upper.len() == 1 {
            spelled.extend(upper);
        } else {
            spelled.push(c);
        }
        word_start = !c.is_alphanumeric();
    }
    spelled
}

/// Validates one scoping attribute and returns it trimmed.
pub(crate) fn attribute<'a>(
    kind: CounterKind,
    name: &str,
    value: Option<&'a str>,
) -> Result<&'a str, SequenceError> {
    let invalid = |reason: String| SequenceError::InvalidScopeContext { kind, reason };

    let value = value
        .map(str::trim)
        .ok_or_else(|| invalid(format!("{name} is required")))?;

    if value.is_empty() {
        return Err(invalid(format!("{name} must not be empty")));
    }
    if value.chars().count() > MAX_ATTRIBUTE_LEN {
        return Err(invalid(format!(
            "{name} must be at most {MAX_ATTRIBUTE_LEN} characters"
        )));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(invalid(format!("{name} must not contain '{KEY_SEPARATOR}'")));
    }
    if value.chars().any(char::is_control) {
        return Err(invalid(format!("{name} must not contain control characters")));
    }
    if !value.chars().any(char::is_alphanumeric) {
        return Err(invalid(format!(
            "{name} must contain at least one letter or digit"
        )));
    }

    Ok(value)
}

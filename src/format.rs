//! Identifier formatting.
//!
//! [`Formatter::format`] renders a kind, its scope context and an allocated
//! sequence value into the identifier stored on the entity. It is a pure
//! function: the same inputs always give the same string.
//!
//! # Scheme
//!
//! Parts are joined with the configured separator (`-` by default). An empty
//! prefix is omitted.
//!
//! | Kind | Layout | Default example |
//! |------|--------|-----------------|
//! | brand | `[prefix-]<PROVINCE><CITY>-<n:4>` | `SDKHI-0003` |
//! | customer | `CUS-<n:5>` | `CUS-00042` |
//! | employee | `EMP-<n:4>` | `EMP-0007` |
//! | inventory | `INV-<key>-<n:5>` | `INV-WH-01-00012` |
//!
//! `<n:w>` is the sequence value zero-padded to *at least* `w` digits. Values
//! wider than `w` keep all their digits (`EMP-12345`); they are never
//! truncated. A kind may set `max_digits`, in which case wider values fail
//! with [`SequenceError::FormatOverflow`].
//!
//! Inventory keys are embedded verbatim, so distinct keys always give
//! distinct identifiers.
//!
//! # Province and city codes
//!
//! Codes are looked up on the folded name (trimmed, inner whitespace
//! collapsed, lowercased), the same folding the resolver applies to brand
//! scope keys:
//!
//! 1. overrides from [`FormatConfig::with_province_code`] /
//!    [`FormatConfig::with_city_code`];
//! 2. built-in tables of Pakistani provinces (`Sindh` → `SD`) and
//!    IATA-style city codes (`Karachi` → `KHI`).
//!
//! A name found in neither is rejected with
//! [`SequenceError::InvalidScopeContext`]; codes are never guessed.
//! [`FormatConfig::validate`] rejects overrides that would make two brand
//! scopes render the same identifier.

use std::collections::{BTreeMap, HashMap};

use crate::config::ConfigError;
use crate::error::{Result, SequenceError};
use crate::scope::{attribute, fold_name, CounterKind, ScopeContext};

/// Built-in province codes, keyed by lowercase name.
const PROVINCE_CODES: &[(&str, &str)] = &[
    ("azad jammu and kashmir", "AJK"),
    ("balochistan", "BL"),
    ("gilgit-baltistan", "GB"),
    ("islamabad capital territory", "ICT"),
    ("khyber pakhtunkhwa", "KP"),
    ("punjab", "PB"),
    ("sindh", "SD"),
];

/// Built-in city codes, keyed by lowercase name.
const CITY_CODES: &[(&str, &str)] = &[
    ("bahawalpur", "BHV"),
    ("chitral", "CJL"),
    ("dera ghazi khan", "DEA"),
    ("dera ismail khan", "DSK"),
    ("faisalabad", "LYP"),
    ("gilgit", "GIL"),
    ("gwadar", "GWD"),
    ("hyderabad", "HDD"),
    ("islamabad", "ISB"),
    ("karachi", "KHI"),
    ("lahore", "LHE"),
    ("larkana", "LRG"),
    ("multan", "MUX"),
    ("muzaffarabad", "MFG"),
    ("nawabshah", "WNS"),
    ("peshawar", "PEW"),
    ("quetta", "UET"),
    ("rahim yar khan", "RYK"),
    ("rawalpindi", "RWP"),
    ("sialkot", "SKT"),
    ("skardu", "KDU"),
    ("sukkur", "SKZ"),
    ("turbat", "TUK"),
];

/// Layout of one kind's identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KindFormat {
    /// Leading part of the identifier; omitted when empty.
    #[cfg_attr(feature = "serde", serde(default))]
    pub prefix: String,
    /// Minimum number of digits of the sequence part.
    pub width: usize,
    /// Maximum number of digits of the sequence part, unlimited if `None`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_digits: Option<usize>,
}

impl KindFormat {
    /// Creates a layout with the given prefix and padding width.
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            max_digits: None,
        }
    }

    /// Caps the number of digits, returning `self` for method chaining.
    pub fn with_max_digits(mut self, max_digits: usize) -> Self {
        self.max_digits = Some(max_digits);
        self
    }
}

/// Identifier layouts for every kind plus province/city code overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FormatConfig {
    /// Separator placed between identifier parts.
    pub separator: String,
    /// Layout of brand identifiers.
    pub brand: KindFormat,
    /// Layout of customer identifiers.
    pub customer: KindFormat,
    /// Layout of employee identifiers.
    pub employee: KindFormat,
    /// Layout of inventory identifiers.
    pub inventory: KindFormat,
    /// Province code overrides, keyed by province name.
    pub province_codes: BTreeMap<String, String>,
    /// City code overrides, keyed by city name.
    pub city_codes: BTreeMap<String, String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            separator: "-".to_string(),
            brand: KindFormat::new("", 4),
            customer: KindFormat::new("CUS", 5),
            employee: KindFormat::new("EMP", 4),
            inventory: KindFormat::new("INV", 5),
            province_codes: BTreeMap::new(),
            city_codes: BTreeMap::new(),
        }
    }
}

impl FormatConfig {
    /// Returns the layout of `kind`.
    pub fn kind(&self, kind: CounterKind) -> &KindFormat {
        match kind {
            CounterKind::Brand => &self.brand,
            CounterKind::Customer => &self.customer,
            CounterKind::Employee => &self.employee,
            CounterKind::Inventory => &self.inventory,
        }
    }

    /// Sets the separator, returning `self` for method chaining.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the layout of `kind`, returning `self` for method chaining.
    pub fn with_kind(mut self, kind: CounterKind, format: KindFormat) -> Self {
        match kind {
            CounterKind::Brand => self.brand = format,
            CounterKind::Customer => self.customer = format,
            CounterKind::Employee => self.employee = format,
            CounterKind::Inventory => self.inventory = format,
        }
        self
    }

    /// Overrides the code of a province.
    pub fn with_province_code(mut self, province: &str, code: impl Into<String>) -> Self {
        self.province_codes.insert(fold_name(province), code.into());
        self
    }

    /// Overrides the code of a city.
    pub fn with_city_code(mut self, city: &str, code: impl Into<String>) -> Self {
        self.city_codes.insert(fold_name(city), code.into());
        self
    }

    /// Checks that every identifier this configuration renders maps back to
    /// exactly one scope.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if:
    /// - the separator is empty or contains a digit;
    /// - a kind's `max_digits` is zero or smaller than its width;
    /// - an override code is not made of uppercase ASCII letters;
    /// - two names fold to the same override;
    /// - two provinces, or two cities, share a code;
    /// - two (province, city) pairs concatenate to the same code.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.separator.is_empty() || self.separator.chars().any(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid(format!(
                "separator {:?} must be non-empty and contain no digit",
                self.separator
            )));
        }
        for kind in CounterKind::ALL {
            let layout = self.kind(kind);
            match layout.max_digits {
                Some(0) => {
                    return Err(ConfigError::Invalid(format!(
                        "{kind} max_digits must be positive"
                    )))
                }
                Some(max) if max < layout.width => {
                    return Err(ConfigError::Invalid(format!(
                        "{kind} max_digits ({max}) is smaller than its width ({})",
                        layout.width
                    )))
                }
                _ => {}
            }
        }

        let provinces = code_table("province", &self.province_codes, PROVINCE_CODES)?;
        let cities = code_table("city", &self.city_codes, CITY_CODES)?;

        let mut pairs: HashMap<String, (&str, &str)> = HashMap::new();
        for (province, province_code) in &provinces {
            for (city, city_code) in &cities {
                let code = format!("{province_code}{city_code}");
                if let Some((p, c)) = pairs.insert(code.clone(), (province.as_str(), city.as_str())) {
                    return Err(ConfigError::Invalid(format!(
                        "brand code {code} is shared by {p}/{c} and {province}/{city}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Renders identifiers according to a [`FormatConfig`].
///
/// # Examples
///
/// ```rust
/// use progressivi::format::Formatter;
/// use progressivi::scope::{CounterKind, ScopeContext};
///
/// let formatter = Formatter::new();
/// let ctx = ScopeContext::geo("Sindh", "Karachi");
///
/// assert_eq!(formatter.format(CounterKind::Brand, &ctx, 3).unwrap(), "SDKHI-0003");
/// assert_eq!(
///     formatter.format(CounterKind::Customer, &ScopeContext::global(), 42).unwrap(),
///     "CUS-00042"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: FormatConfig,
}

impl Formatter {
    /// Creates a formatter with the default layouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a formatter with the given configuration.
    ///
    /// The configuration is used as is; run [`FormatConfig::validate`] first
    /// to rule out overrides that render two scopes alike.
    pub fn with_config(config: FormatConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Formats sequence value `value` allocated for `kind` in `context`.
    ///
    /// # Errors
    ///
    /// - [`SequenceError::InvalidScopeContext`] if `context` lacks an attribute
    ///   the layout needs, or names a province or city without a code.
    /// - [`SequenceError::FormatOverflow`] if `value` exceeds the kind's
    ///   `max_digits`.
    pub fn format(&self, kind: CounterKind, context: &ScopeContext, value: u64) -> Result<String> {
        let mut parts = self.scope_parts(kind, context)?;
        parts.push(digits(kind, self.config.kind(kind), value)?);
        Ok(parts.join(&self.config.separator))
    }

    /// Checks that identifiers of `kind` can be rendered for `context`,
    /// whatever the sequence value.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::InvalidScopeContext`] under the same
    /// conditions as [`format`](Self::format).
    pub fn check(&self, kind: CounterKind, context: &ScopeContext) -> Result<()> {
        self.scope_parts(kind, context).map(|_| ())
    }

    /// Returns the code used for `province`, if it has one.
    pub fn province_code(&self, province: &str) -> Option<&str> {
        lookup(&self.config.province_codes, PROVINCE_CODES, province)
    }

    /// Returns the code used for `city`, if it has one.
    pub fn city_code(&self, city: &str) -> Option<&str> {
        lookup(&self.config.city_codes, CITY_CODES, city)
    }

    /// Every part of the identifier before the sequence digits.
    fn scope_parts(&self, kind: CounterKind, context: &ScopeContext) -> Result<Vec<String>> {
        let layout = self.config.kind(kind);
        let mut parts: Vec<String> = Vec::with_capacity(3);

        if !layout.prefix.is_empty() {
            parts.push(layout.prefix.clone());
        }

        match kind {
            CounterKind::Brand => {
                let unknown = |name: &str, value: &str| SequenceError::InvalidScopeContext {
                    kind,
                    reason: format!("{name} '{value}' has no code"),
                };
                let province = attribute(kind, "province", context.province())?;
                let city = attribute(kind, "city", context.city())?;
                let province_code = self
                    .province_code(province)
                    .ok_or_else(|| unknown("province", province))?;
                let city_code = self.city_code(city).ok_or_else(|| unknown("city", city))?;
                parts.push(format!("{province_code}{city_code}"));
            }
            CounterKind::Customer | CounterKind::Employee => {}
            CounterKind::Inventory => {
                parts.push(attribute(kind, "key", context.key())?.to_string());
            }
        }

        Ok(parts)
    }
}

/// Renders the sequence part: zero-padded to the layout width, never truncated.
fn digits(kind: CounterKind, layout: &KindFormat, value: u64) -> Result<String> {
    let digits = value.to_string();
    if let Some(max_digits) = layout.max_digits {
        if digits.len() > max_digits {
            return Err(SequenceError::FormatOverflow {
                kind,
                value,
                max_digits,
            });
        }
    }
    Ok(format!("{digits:0>width$}", width = layout.width))
}

fn lookup<'a>(
    overrides: &'a BTreeMap<String, String>,
    builtin: &'static [(&'static str, &'static str)],
    name: &str,
) -> Option<&'a str> {
    let name = fold_name(name);
    overrides
        .iter()
        .find(|(key, _)| fold_name(key) == name)
        .map(|(_, code)| code.as_str())
        .or_else(|| {
            builtin
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, code)| *code)
        })
}

/// Merges overrides into a built-in table, keyed by folded name, and checks
/// that no two names share a code.
fn code_table<'a>(
    what: &str,
    overrides: &'a BTreeMap<String, String>,
    builtin: &'static [(&'static str, &'static str)],
) -> std::result::Result<BTreeMap<String, &'a str>, ConfigError> {
    let mut table: BTreeMap<String, &'a str> = builtin
        .iter()
        .map(|(name, code)| (name.to_string(), *code))
        .collect();

    let mut overridden = BTreeMap::new();
    for (name, code) in overrides {
        let folded = fold_name(name);
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid(format!(
                "{what} code {code:?} for '{name}' must be uppercase ASCII letters"
            )));
        }
        if let Some(previous) = overridden.insert(folded.clone(), name) {
            return Err(ConfigError::Invalid(format!(
                "{what} overrides '{previous}' and '{name}' name the same {what}"
            )));
        }
        table.insert(folded, code.as_str());
    }

    {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for (name, code) in &table {
            if let Some(owner) = owners.insert(*code, name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "{what} code {code} is shared by '{owner}' and '{name}'"
                )));
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_default_layout() {
        let formatter = Formatter::new();
        let ctx = ScopeContext::geo("Sindh", "Karachi");
        assert_eq!(formatter.format(CounterKind::Brand, &ctx, 3).unwrap(), "SDKHI-0003");
        assert_eq!(formatter.format(CounterKind::Brand, &ctx, 1).unwrap(), "SDKHI-0001");
    }

    #[test]
    fn test_global_layouts() {
        let formatter = Formatter::new();
        let ctx = ScopeContext::global();
        assert_eq!(formatter.format(CounterKind::Customer, &ctx, 42).unwrap(), "CUS-00042");
        assert_eq!(formatter.format(CounterKind::Employee, &ctx, 7).unwrap(), "EMP-0007");
    }

    #[test]
    fn test_inventory_layout() {
        let formatter = Formatter::new();
        let ctx = ScopeContext::keyed(" WH-01 ");
        assert_eq!(
            formatter.format(CounterKind::Inventory, &ctx, 12).unwrap(),
            "INV-WH-01-00012"
        );
    }

    #[test]
    fn test_deterministic() {
        let formatter = Formatter::new();
        let ctx = ScopeContext::geo("Punjab", "Lahore");
        let first = formatter.format(CounterKind::Brand, &ctx, 77).unwrap();
        let second = formatter.format(CounterKind::Brand, &ctx, 77).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "PBLHE-0077");
    }

    #[test]
    fn test_wide_values_are_not_truncated() {
        let formatter = Formatter::new();
        let ctx = ScopeContext::global();
        assert_eq!(formatter.format(CounterKind::Employee, &ctx, 9_999).unwrap(), "EMP-9999");
        assert_eq!(formatter.format(CounterKind::Employee, &ctx, 12_345).unwrap(), "EMP-12345");
        assert_eq!(
            formatter.format(CounterKind::Employee, &ctx, u64::MAX).unwrap(),
            format!("EMP-{}", u64::MAX)
        );
    }

    #[test]
    fn test_max_digits_overflow() {
        let config = FormatConfig::default()
            .with_kind(CounterKind::Employee, KindFormat::new("EMP", 4).with_max_digits(4));
        let formatter = Formatter::with_config(config);
        let ctx = ScopeContext::global();

        assert_eq!(formatter.format(CounterKind::Employee, &ctx, 9_999).unwrap(), "EMP-9999");
        let err = formatter.format(CounterKind::Employee, &ctx, 10_000).unwrap_err();
        assert!(matches!(
            err,
            SequenceError::FormatOverflow {
                kind: CounterKind::Employee,
                value: 10_000,
                max_digits: 4
            }
        ));
    }

    #[test]
    fn test_brand_requires_geo_context() {
        let formatter = Formatter::new();
        let err = formatter
            .format(CounterKind::Brand, &ScopeContext::new().with_province("Sindh"), 1)
            .unwrap_err();
        assert!(matches!(err, SequenceError::InvalidScopeContext { .. }));
    }

    #[test]
    fn test_inventory_requires_key() {
        let formatter = Formatter::new();
        let err = formatter
            .format(CounterKind::Inventory, &ScopeContext::global(), 1)
            .unwrap_err();
        assert!(matches!(err, SequenceError::InvalidScopeContext { .. }));
    }

    #[test]
    fn test_builtin_codes_are_case_insensitive() {
        let formatter = Formatter::new();
        assert_eq!(formatter.province_code("khyber pakhtunkhwa"), Some("KP"));
        assert_eq!(formatter.province_code("  SINDH "), Some("SD"));
        assert_eq!(formatter.city_code("Dera  Ismail Khan"), Some("DSK"));
        assert_eq!(formatter.city_code("faisalabad"), Some("LYP"));
        assert_eq!(formatter.city_code("Larkana"), Some("LRG"));
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let formatter = Formatter::new();
        assert_eq!(formatter.city_code("Larkhana"), None);
        assert_eq!(formatter.province_code("Northern Areas"), None);

        for ctx in [
            ScopeContext::geo("Sindh", "Larkhana"),
            ScopeContext::geo("Northern Areas", "Gilgit"),
        ] {
            let err = formatter.format(CounterKind::Brand, &ctx, 1).unwrap_err();
            assert!(matches!(err, SequenceError::InvalidScopeContext { .. }));
            assert!(formatter.check(CounterKind::Brand, &ctx).is_err());
        }
        assert!(formatter
            .check(CounterKind::Brand, &ScopeContext::geo("Sindh", "Karachi"))
            .is_ok());
    }

    #[test]
    fn test_distinct_brand_scopes_never_share_identifiers() {
        let formatter = Formatter::new();
        let mut seen = HashMap::new();
        for (province, _) in PROVINCE_CODES {
            for (city, _) in CITY_CODES {
                let ctx = ScopeContext::geo(*province, *city);
                let id = formatter.format(CounterKind::Brand, &ctx, 1).unwrap();
                let scope = crate::scope::resolve(CounterKind::Brand, &ctx).unwrap();
                if let Some(other) = seen.insert(id.clone(), scope.clone()) {
                    panic!("{id} issued for both {other} and {scope}");
                }
            }
        }
    }

    #[test]
    fn test_case_variants_render_alike() {
        let formatter = Formatter::new();
        let upper = formatter
            .format(CounterKind::Brand, &ScopeContext::geo("Sindh", "Karachi"), 1)
            .unwrap();
        let lower = formatter
            .format(CounterKind::Brand, &ScopeContext::geo("sindh", "KARACHI"), 1)
            .unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(FormatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_shared_city_code() {
        let config = FormatConfig::default().with_city_code("Mirpur Khas", "KHI");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("KHI"), "{err}");
    }

    #[test]
    fn test_validate_rejects_ambiguous_concatenation() {
        // "SD" + "KHIX" and "SDK" + "HIX" both read SDKHIX.
        let config = FormatConfig::default()
            .with_city_code("Mirpur Khas", "KHIX")
            .with_province_code("Kashmir", "SDK")
            .with_city_code("Hala", "HIX");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SDKHIX"), "{err}");
    }

    #[test]
    fn test_validate_rejects_malformed_override() {
        for code in ["", "lrk", "LR1", "L-K"] {
            let config = FormatConfig::default().with_city_code("Larkana", code);
            assert!(config.validate().is_err(), "{code:?} accepted");
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_override_names() {
        let mut config = FormatConfig::default();
        config.city_codes.insert("Mirpur Khas".into(), "MPK".into());
        config.city_codes.insert("mirpur  khas".into(), "MKS".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_separator_with_digits() {
        assert!(FormatConfig::default().with_separator("").validate().is_err());
        assert!(FormatConfig::default().with_separator("0").validate().is_err());
        assert!(FormatConfig::default().with_separator("/").validate().is_ok());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = FormatConfig::default()
            .with_province_code("Sindh", "SN")
            .with_city_code("Larkana", "LRK")
            .with_city_code("Mirpur Khas", "MPK");
        assert!(config.validate().is_ok());
        let formatter = Formatter::with_config(config);
        let ctx = ScopeContext::geo("Sindh", "Larkana");
        assert_eq!(formatter.format(CounterKind::Brand, &ctx, 5).unwrap(), "SNLRK-0005");
        let ctx = ScopeContext::geo("sindh", "mirpur khas");
        assert_eq!(formatter.format(CounterKind::Brand, &ctx, 6).unwrap(), "SNMPK-0006");
    }

    #[test]
    fn test_custom_prefix_and_separator() {
        let config = FormatConfig::default()
            .with_separator("/")
            .with_kind(CounterKind::Brand, KindFormat::new("BR", 3));
        let formatter = Formatter::with_config(config);
        let ctx = ScopeContext::geo("Punjab", "Multan");
        assert_eq!(formatter.format(CounterKind::Brand, &ctx, 8).unwrap(), "BR/PBMUX/008");
    }

    #[test]
    fn test_empty_prefix_is_omitted() {
        let config = FormatConfig::default().with_kind(CounterKind::Customer, KindFormat::new("", 3));
        let formatter = Formatter::with_config(config);
        assert_eq!(
            formatter.format(CounterKind::Customer, &ScopeContext::global(), 4).unwrap(),
            "004"
        );
    }
}

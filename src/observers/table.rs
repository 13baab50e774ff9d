//! Table observer for pretty-printing counter records.
//!
//! This module provides [`TableObserver`], which renders [`CounterRecord`]s
//! as a formatted ASCII table using the `tabled` crate.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! progressivi = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ## Standard format
//!
//! ```rust
//! use progressivi::observers::table::{TableObserver, TableStyle};
//! use progressivi::scope::ScopeKey;
//! use progressivi::store::CounterRecord;
//!
//! let records = vec![
//!     CounterRecord::new(ScopeKey::from_raw("brand:Sindh:Karachi"), 3),
//!     CounterRecord::new(ScopeKey::from_raw("customer"), 42),
//! ];
//!
//! let observer = TableObserver::new().with_style(TableStyle::Rounded);
//! println!("{}", observer.render(&records));
//! // ╭─────────────────────┬──────────┬──────────╮
//! // │ Scope               │ Kind     │ Sequence │
//! // ├─────────────────────┼──────────┼──────────┤
//! // │ brand:Sindh:Karachi │ brand    │ 3        │
//! // │ customer            │ customer │ 42       │
//! // ╰─────────────────────┴──────────┴──────────╯
//! ```
//!
//! ## Compact format (multiple columns)
//!
//! ```rust
//! use progressivi::observers::table::TableObserver;
//!
//! let observer = TableObserver::new().compact(true).columns(3);
//! # let _ = observer;
//! // ╭────────────────────────┬──────────────┬─────────────╮
//! // │ brand:Sindh:Karachi: 3 │ customer: 42 │ employee: 7 │
//! // ╰────────────────────────┴──────────────┴─────────────╯
//! ```

use tabled::settings::object::Rows;
use tabled::settings::{Remove, Style};
use tabled::{builder::Builder, Table, Tabled};

use crate::store::CounterRecord;

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

/// Separator between scope and value in compact mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompactSeparator {
    /// Colon separator: "scope: value"
    #[default]
    Colon,
    /// Equals separator: "scope = value"
    Equals,
    /// Arrow separator: "scope → value"
    Arrow,
}

impl CompactSeparator {
    /// Returns the separator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompactSeparator::Colon => ": ",
            CompactSeparator::Equals => " = ",
            CompactSeparator::Arrow => " → ",
        }
    }
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The style to use for rendering.
    pub style: TableStyle,
    /// Whether to show the header row (only in non-compact mode).
    pub show_header: bool,
    /// Custom title for the table (optional).
    pub title: Option<String>,
    /// Whether to use compact format (scope: value in cells).
    pub compact: bool,
    /// Number of columns in compact mode (default: 1).
    pub columns: usize,
    /// Separator between scope and value in compact mode.
    pub separator: CompactSeparator,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
            compact: false,
            columns: 1,
            separator: CompactSeparator::default(),
        }
    }
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Sequence")]
    sequence: u64,
}

impl From<&CounterRecord> for RecordRow {
    fn from(record: &CounterRecord) -> Self {
        Self {
            scope: record.scope_key.to_string(),
            kind: record
                .scope_key
                .kind()
                .map_or_else(|| "-".to_string(), |kind| kind.to_string()),
            sequence: record.sequence_value,
        }
    }
}

/// An observer that renders counter records as a table.
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates a new table observer with default settings.
    ///
    /// Default style is [`TableStyle::Rounded`] in standard (non-compact) mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table observer with the specified configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets whether to show the header row.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets a title printed above the table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Enables compact mode, where each cell holds `scope: value`.
    pub fn compact(mut self, enabled: bool) -> Self {
        self.config.compact = enabled;
        self
    }

    /// Sets the number of columns in compact mode (at least 1).
    pub fn columns(mut self, count: usize) -> Self {
        self.config.columns = count.max(1);
        self
    }

    /// Sets the separator used in compact mode.
    pub fn separator(mut self, sep: CompactSeparator) -> Self {
        self.config.separator = sep;
        self
    }

    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
    }

    fn titled(&self, table: Table) -> String {
        match &self.config.title {
            Some(title) => format!("{}\n{}", title, table),
            None => table.to_string(),
        }
    }

    fn render_compact(&self, records: &[CounterRecord]) -> String {
        if records.is_empty() {
            return String::new();
        }

        let cols = self.config.columns.max(1);
        let mut builder = Builder::default();

        for chunk in records.chunks(cols) {
            let mut row: Vec<String> = chunk
                .iter()
                .map(|record| {
                    format!(
                        "{}{}{}",
                        record.scope_key,
                        self.config.separator.as_str(),
                        record.sequence_value
                    )
                })
                .collect();
            // Pad the last row
            row.resize(cols, String::new());
            builder.push_record(row);
        }

        let mut table = builder.build();
        self.apply_style(&mut table);
        self.titled(table)
    }

    fn render_standard(&self, records: &[CounterRecord]) -> String {
        let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();

        let mut table = Table::new(&rows);
        self.apply_style(&mut table);

        if !self.config.show_header {
            table.with(Remove::row(Rows::first()));
        }

        self.titled(table)
    }

    /// Renders `records` as a formatted table string.
    pub fn render(&self, records: &[CounterRecord]) -> String {
        if self.config.compact {
            self.render_compact(records)
        } else {
            self.render_standard(records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKey;

    fn records() -> Vec<CounterRecord> {
        vec![
            CounterRecord::new(ScopeKey::from_raw("brand:Sindh:Karachi"), 3),
            CounterRecord::new(ScopeKey::from_raw("customer"), 42),
            CounterRecord::new(ScopeKey::from_raw("inventory:WH-01"), 7),
        ]
    }

    #[test]
    fn test_render_empty() {
        let output = TableObserver::new().render(&[]);
        assert!(output.contains("Scope"));
        assert!(output.contains("Sequence"));
    }

    #[test]
    fn test_render_empty_compact() {
        assert!(TableObserver::new().compact(true).render(&[]).is_empty());
    }

    #[test]
    fn test_render_standard() {
        let output = TableObserver::new().render(&records());
        assert!(output.contains("brand:Sindh:Karachi"));
        assert!(output.contains("inventory"));
        assert!(output.contains("42"));
    }

    #[test]
    fn test_render_unknown_kind() {
        let output = TableObserver::new()
            .with_style(TableStyle::Ascii)
            .render(&[CounterRecord::new(ScopeKey::from_raw("legacy"), 1)]);
        assert!(output.contains("| legacy | -    | 1        |"));
    }

    #[test]
    fn test_render_without_header() {
        let output = TableObserver::new().with_header(false).render(&records());
        assert!(!output.contains("Scope"));
        assert!(output.contains("customer"));
    }

    #[test]
    fn test_render_with_title() {
        let output = TableObserver::new()
            .with_title("Counters")
            .render(&records());
        assert!(output.starts_with("Counters\n"));
    }

    #[test]
    fn test_render_markdown() {
        let output = TableObserver::new()
            .with_style(TableStyle::Markdown)
            .render(&records());
        assert!(output.contains("|---"));
    }

    #[test]
    fn test_render_compact_columns() {
        let output = TableObserver::new()
            .compact(true)
            .columns(2)
            .separator(CompactSeparator::Equals)
            .with_style(TableStyle::Ascii)
            .render(&records());
        assert!(output.contains("brand:Sindh:Karachi = 3"));
        assert!(output.contains("customer = 42"));
        assert!(output.contains("inventory:WH-01 = 7"));
        // 2 rows of cells plus 3 borders
        assert_eq!(output.lines().count(), 5);
    }

    #[test]
    fn test_columns_at_least_one() {
        let output = TableObserver::new()
            .compact(true)
            .columns(0)
            .render(&records());
        assert!(output.contains("customer: 42"));
    }
}

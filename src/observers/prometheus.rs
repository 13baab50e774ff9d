//! Prometheus observer for exporting counter records using the official
//! `prometheus` crate.
//!
//! Every record becomes one sample of a single metric family (default name
//! `sequence_value`) labelled with the record's `scope` and `kind`:
//!
//! ```text
//! # HELP sequence_value Last sequence value allocated per scope
//! # TYPE sequence_value counter
//! sequence_value{kind="brand",scope="brand:Sindh:Karachi"} 3
//! sequence_value{kind="customer",scope="customer"} 42
//! ```
//!
//! # Feature Flag
//!
//! This module requires the `prometheus` feature:
//!
//! ```toml
//! [dependencies]
//! progressivi = { version = "0.1", features = ["prometheus"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use progressivi::observers::prometheus::{MetricType, PrometheusObserver};
//! use progressivi::scope::ScopeKey;
//! use progressivi::store::CounterRecord;
//!
//! let records = vec![CounterRecord::new(ScopeKey::from_raw("customer"), 42)];
//!
//! let observer = PrometheusObserver::new()
//!     .with_namespace("pharma")
//!     .with_const_label("instance", "backend-1")
//!     .with_type(MetricType::Gauge);
//!
//! let output = observer.render(&records)?;
//! assert!(output.contains("# TYPE pharma_sequence_value gauge"));
//! # Ok::<(), progressivi::observers::ObserverError>(())
//! ```

use std::collections::HashMap;

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use super::{ObserverError, Result};
use crate::store::CounterRecord;

const DEFAULT_METRIC_NAME: &str = "sequence_value";
const DEFAULT_HELP: &str = "Last sequence value allocated per scope";
const LABELS: [&str; 2] = ["scope", "kind"];

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricType {
    /// Sequence values only go up, so a counter is the natural fit.
    #[default]
    Counter,
    /// For dashboards that prefer plain values.
    Gauge,
}

/// Observer that exports counter records in the Prometheus text format.
#[derive(Debug, Clone)]
pub struct PrometheusObserver {
    name: String,
    help: String,
    namespace: Option<String>,
    subsystem: Option<String>,
    const_labels: HashMap<String, String>,
    metric_type: MetricType,
}

impl Default for PrometheusObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusObserver {
    /// Creates a new observer exporting a `sequence_value` counter.
    pub fn new() -> Self {
        Self {
            name: DEFAULT_METRIC_NAME.to_string(),
            help: DEFAULT_HELP.to_string(),
            namespace: None,
            subsystem: None,
            const_labels: HashMap::new(),
            metric_type: MetricType::default(),
        }
    }

    /// Sets the metric name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    /// Sets the namespace (prefix) of the metric.
    ///
    /// The namespace is prepended to the metric name with an underscore.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Sets the subsystem, placed between namespace and metric name.
    pub fn with_subsystem(mut self, subsystem: &str) -> Self {
        self.subsystem = Some(subsystem.to_string());
        self
    }

    /// Adds a constant label to every sample.
    pub fn with_const_label(mut self, name: &str, value: &str) -> Self {
        self.const_labels
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Sets the metric type.
    pub fn with_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    fn opts(&self) -> Opts {
        let mut opts = Opts::new(self.name.as_str(), self.help.as_str())
            .const_labels(self.const_labels.clone());
        if let Some(namespace) = &self.namespace {
            opts = opts.namespace(namespace.as_str());
        }
        if let Some(subsystem) = &self.subsystem {
            opts = opts.subsystem(subsystem.as_str());
        }
        opts
    }

    /// Renders `records` to Prometheus exposition format.
    ///
    /// A fresh registry is built on every call, so rendering twice never
    /// conflicts with earlier registrations.
    ///
    /// # Errors
    ///
    /// Returns an error if metric creation or encoding fails, or if a value
    /// does not fit a gauge.
    pub fn render(&self, records: &[CounterRecord]) -> Result<String> {
        let registry = Registry::new();

        match self.metric_type {
            MetricType::Counter => {
                let vec = IntCounterVec::new(self.opts(), &LABELS)?;
                for record in records {
                    vec.with_label_values(&label_values(record))
                        .inc_by(record.sequence_value);
                }
                registry.register(Box::new(vec))?;
            }
            MetricType::Gauge => {
                let vec = IntGaugeVec::new(self.opts(), &LABELS)?;
                for record in records {
                    let value = i64::try_from(record.sequence_value).map_err(|_| {
                        ObserverError::Metric(format!(
                            "sequence value of {} exceeds the gauge range",
                            record.scope_key
                        ))
                    })?;
                    vec.with_label_values(&label_values(record)).set(value);
                }
                registry.register(Box::new(vec))?;
            }
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Renders `records` to bytes (useful for HTTP responses).
    pub fn render_bytes(&self, records: &[CounterRecord]) -> Result<Vec<u8>> {
        Ok(self.render(records)?.into_bytes())
    }
}

fn label_values(record: &CounterRecord) -> [&str; 2] {
    [
        record.scope_key.as_str(),
        record.scope_key.kind().map_or("", |kind| kind.as_str()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKey;

    fn records() -> Vec<CounterRecord> {
        vec![
            CounterRecord::new(ScopeKey::from_raw("brand:Sindh:Karachi"), 3),
            CounterRecord::new(ScopeKey::from_raw("customer"), 42),
        ]
    }

    fn sample<'a>(output: &'a str, scope: &str) -> Option<&'a str> {
        let label = format!("scope=\"{scope}\"");
        output
            .lines()
            .find(|line| !line.starts_with('#') && line.contains(&label))
    }

    #[test]
    fn test_render_counter() {
        let output = PrometheusObserver::new().render(&records()).unwrap();
        assert!(output.contains("# HELP sequence_value Last sequence value allocated per scope"));
        assert!(output.contains("# TYPE sequence_value counter"));

        let karachi = sample(&output, "brand:Sindh:Karachi").unwrap();
        assert!(karachi.contains("kind=\"brand\""));
        assert!(karachi.ends_with(" 3"));

        let customer = sample(&output, "customer").unwrap();
        assert!(customer.ends_with(" 42"));
    }

    #[test]
    fn test_render_gauge() {
        let output = PrometheusObserver::new()
            .with_type(MetricType::Gauge)
            .render(&records())
            .unwrap();
        assert!(output.contains("# TYPE sequence_value gauge"));
        assert!(sample(&output, "customer").unwrap().ends_with(" 42"));
    }

    #[test]
    fn test_gauge_overflow() {
        let err = PrometheusObserver::new()
            .with_type(MetricType::Gauge)
            .render(&[CounterRecord::new(ScopeKey::from_raw("customer"), u64::MAX)])
            .unwrap_err();
        assert!(matches!(err, ObserverError::Metric(_)));
    }

    #[test]
    fn test_namespace_subsystem_and_const_labels() {
        let output = PrometheusObserver::new()
            .with_namespace("pharma")
            .with_subsystem("ids")
            .with_const_label("instance", "backend-1")
            .render(&records())
            .unwrap();
        assert!(output.contains("# TYPE pharma_ids_sequence_value counter"));
        assert!(sample(&output, "customer")
            .unwrap()
            .contains("instance=\"backend-1\""));
    }

    #[test]
    fn test_custom_name_and_help() {
        let output = PrometheusObserver::new()
            .with_name("issued_total")
            .with_help("Identifiers issued")
            .render(&records())
            .unwrap();
        assert!(output.contains("# HELP issued_total Identifiers issued"));
    }

    #[test]
    fn test_render_empty() {
        let output = PrometheusObserver::new().render(&[]).unwrap();
        assert!(!output.contains("scope="));
    }

    #[test]
    fn test_invalid_metric_name() {
        let err = PrometheusObserver::new()
            .with_name("not a metric")
            .render(&records())
            .unwrap_err();
        assert!(matches!(err, ObserverError::Prometheus(_)));
    }

    #[test]
    fn test_render_bytes() {
        let observer = PrometheusObserver::new();
        let bytes = observer.render_bytes(&records()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), observer.render(&records()).unwrap());
    }
}

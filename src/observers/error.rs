//! Unified error type for all observers.

use thiserror::Error;

/// Unified error type for all observer operations.
///
/// Client code can switch between observers without changing its error
/// handling.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Error from the JSON observer.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the Prometheus observer.
    #[cfg(feature = "prometheus")]
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Error encoding to UTF-8.
    #[error("utf8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic metric error.
    #[error("metric error: {0}")]
    Metric(String),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;

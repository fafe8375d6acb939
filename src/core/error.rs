//! Error types shared across the crate.

use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while reporting metrics
#[derive(Error, Debug)]
pub enum ReporterError {
    /// Invalid configuration or unusable spool directory
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection refused, DNS failure or any other transport problem
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout
    #[error("Timeout error: request took longer than {timeout_ms}ms")]
    Timeout {
        /// Timeout the request was allowed, in milliseconds
        timeout_ms: u64,
    },

    /// The server answered with a non-success status
    #[error("Unsuccessful response: HTTP {status} - {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, empty if it could not be read
        body: String,
    },

    /// Spool file could not be written, read or removed
    #[error("Spool error: {0}")]
    Spool(String),

    /// Index template resource could not be loaded
    #[error("Template error: {0}")]
    Template(String),

    /// Bulk payload could not be rendered
    #[error("Encoding error: {0}")]
    Encode(String),
}

/// Result type alias for reporter operations
pub type Result<T> = std::result::Result<T, ReporterError>;

impl ReporterError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a new spool error
    pub fn spool<S: Into<String>>(msg: S) -> Self {
        Self::Spool(msg.into())
    }

    /// Creates a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Classifies a transport failure from the HTTP client.
    ///
    /// `timeout` is the request timeout the client was configured with and is
    /// only used to report how long the call was allowed to take.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {}", err))
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Returns true if a later attempt may succeed without operator action
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns the error category for logging
    ///
    /// ```
    /// use elastic_metrics::ReporterError;
    ///
    /// let err = ReporterError::Status { status: 503, body: String::new() };
    /// assert_eq!(err.category(), "status");
    /// assert!(err.is_recoverable());
    /// ```
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::Spool(_) => "spool",
            Self::Template(_) => "template",
            Self::Encode(_) => "encode",
        }
    }
}

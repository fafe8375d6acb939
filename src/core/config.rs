//! Reporter configuration.
//!
//! Configuration can be built programmatically with [`ConfigBuilder`] or
//! loaded from YAML. A built config is validated once and then treated as an
//! immutable snapshot for the lifetime of a reporter.

use crate::core::{ReporterError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Largest number of decimal places accepted for double gauge values
pub const MAX_DECIMAL_PLACES: usize = 10;

/// Complete configuration for an Elasticsearch reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Base url of the Elasticsearch instance (no trailing slash)
    pub url: String,
    /// Value of `_type` in every bulk action line
    pub index_type: String,
    /// Index name prefix; the daily suffix is appended to it
    pub index_prefix: String,
    /// Template checked and installed on startup, `None` skips the check
    pub template_name: Option<String>,
    /// Directory searched for `<template_name>.json` before the built-in templates
    pub template_dir: Option<PathBuf>,
    /// Name of the collection timestamp field
    pub timestamp_field: String,
    /// Name of the metric type field
    pub type_field: String,
    /// Name of the metric name field
    pub name_field: String,
    /// Static tags added to every document, in insertion order
    pub tags: IndexMap<String, String>,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Read timeout
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Write timeout
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
    /// Directory holding payloads that failed to send
    pub directory: PathBuf,
    /// Decimal places used when rendering double gauges
    pub decimal_places: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig {
            url: "http://localhost:9200".to_string(),
            index_type: "metric".to_string(),
            index_prefix: "metric-".to_string(),
            template_name: Some("metric-1".to_string()),
            template_dir: None,
            timestamp_field: "ts".to_string(),
            type_field: "type".to_string(),
            name_field: "name".to_string(),
            tags: IndexMap::new(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            directory: PathBuf::from("./metric-spool"),
            decimal_places: 2,
        }
    }
}

impl ReporterConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(ReporterError::config("url must not be empty"));
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ReporterError::config(format!(
                "url must start with http:// or https://, got '{}'",
                self.url
            )));
        }

        if self.index_type.is_empty() {
            return Err(ReporterError::config("index_type must not be empty"));
        }

        for (label, field) in [
            ("timestamp_field", &self.timestamp_field),
            ("type_field", &self.type_field),
            ("name_field", &self.name_field),
        ] {
            if field.is_empty() {
                return Err(ReporterError::config(format!("{} must not be empty", label)));
            }
        }

        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(ReporterError::config(format!(
                "decimal_places must be at most {}, got {}",
                MAX_DECIMAL_PLACES, self.decimal_places
            )));
        }

        for (label, timeout) in [
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ReporterError::config(format!("{} must be greater than 0", label)));
            }
        }

        Ok(())
    }

    /// Url of the bulk endpoint
    pub fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.url)
    }

    /// Url of a named index template
    pub fn template_url(&self, name: &str) -> String {
        format!("{}/_template/{}", self.url, name)
    }

    /// Upper bound for a single request once connected
    pub fn request_timeout(&self) -> Duration {
        self.write_timeout + self.read_timeout
    }
}

/// Trim a single trailing slash from a base url.
pub fn normalise_url(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Configuration builder for programmatic construction
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: ReporterConfig,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: ReporterConfig::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| ReporterError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set the base url of the Elasticsearch instance
    pub fn url(mut self, url: &str) -> Self {
        self.config.url = normalise_url(url);
        self
    }

    /// Set the index type
    pub fn index_type(mut self, index_type: &str) -> Self {
        self.config.index_type = index_type.to_string();
        self
    }

    /// Set the index name prefix
    pub fn index_prefix(mut self, prefix: &str) -> Self {
        self.config.index_prefix = prefix.to_string();
        self
    }

    /// Set the template name, `None` disables the startup check
    pub fn template_name(mut self, name: Option<&str>) -> Self {
        self.config.template_name = name.map(str::to_string);
        self
    }

    /// Set the directory searched for template resources
    pub fn template_dir(mut self, dir: PathBuf) -> Self {
        self.config.template_dir = Some(dir);
        self
    }

    /// Set the timestamp field name
    pub fn timestamp_field(mut self, field: &str) -> Self {
        self.config.timestamp_field = field.to_string();
        self
    }

    /// Set the metric type field name
    pub fn type_field(mut self, field: &str) -> Self {
        self.config.type_field = field.to_string();
        self
    }

    /// Set the metric name field name
    pub fn name_field(mut self, field: &str) -> Self {
        self.config.name_field = field.to_string();
        self
    }

    /// Add a tag included in each document; re-adding a key keeps its position
    pub fn add_tag(mut self, key: &str, value: &str) -> Self {
        self.config.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Replace all tags
    pub fn tags(mut self, tags: IndexMap<String, String>) -> Self {
        self.config.tags = tags;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set the spool directory
    pub fn directory(mut self, dir: PathBuf) -> Self {
        self.config.directory = dir;
        self
    }

    /// Set decimal places for double gauges
    pub fn decimal_places(mut self, places: usize) -> Self {
        self.config.decimal_places = places;
        self
    }

    /// Build and validate the configuration
    pub fn build(mut self) -> Result<ReporterConfig> {
        // YAML input bypasses the url setter
        self.config.url = normalise_url(&self.config.url);
        self.config.validate()?;
        Ok(self.config)
    }
}

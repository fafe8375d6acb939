//! Elastic metrics - ships metric snapshots to Elasticsearch.
//!
//! Metrics collected by a registry are rendered into the Elasticsearch bulk
//! format and POSTed to the cluster once per reporting interval. While the
//! cluster is unreachable payloads are spooled to disk and replayed, in
//! order, once delivery succeeds again.
//!
//! # Architecture
//!
//! - `metrics`: the snapshot model handed over by the registry
//! - `export`: bulk payload rendering
//! - `spool`: on-disk queue of undelivered payloads
//! - `reporter`: delivery, replay and index template registration
//! - `core`: configuration and errors
//! - `cli`: operator command line
//!
//! # Example
//!
//! ```no_run
//! use elastic_metrics::core::ConfigBuilder;
//! use elastic_metrics::metrics::{MetricRecord, ReportMetrics};
//! use elastic_metrics::reporter::{ElasticReporter, MetricReporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new()
//!         .url("http://localhost:9200")
//!         .add_tag("host", "web-1")
//!         .build()?;
//!     let reporter = ElasticReporter::new(config).await?;
//!
//!     let now = chrono::Utc::now().timestamp_millis();
//!     let metrics = vec![MetricRecord::counter("org.one.Foo.count", 1, now - 60_000)];
//!     reporter.report(&ReportMetrics::new(now, metrics)).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod export;
pub mod metrics;
pub mod reporter;
pub mod spool;

// Re-export core types for convenience
pub use crate::core::{ReporterConfig, ReporterError, Result};
pub use crate::reporter::{ElasticReporter, MetricReporter};

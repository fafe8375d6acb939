//! Common test utilities and fixtures.

#![allow(dead_code)]

use elastic_metrics::core::{ConfigBuilder, ReporterConfig};
use elastic_metrics::metrics::{MetricRecord, ReportMetrics};
use elastic_metrics::ElasticReporter;
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// Index suffix used by every test cycle.
pub const SUFFIX: &str = "test.metric";

/// Collection timestamp used by every test report.
pub const COLLECTED: i64 = 1_700_000_000_000;

/// Config pointing at the mock server with the template check disabled.
pub fn config_for(server: &MockServer, spool_dir: &Path) -> ReporterConfig {
    ConfigBuilder::new()
        .url(&server.uri())
        .template_name(None)
        .directory(spool_dir.to_path_buf())
        .connect_timeout(Duration::from_secs(1))
        .read_timeout(Duration::from_secs(1))
        .write_timeout(Duration::from_secs(1))
        .build()
        .unwrap()
}

pub async fn reporter_for(server: &MockServer, spool_dir: &Path) -> ElasticReporter {
    ElasticReporter::new(config_for(server, spool_dir)).await.unwrap()
}

/// A report whose payload does not depend on the wall clock.
pub fn gauges(label: &str, count: usize) -> ReportMetrics {
    let metrics = (0..count)
        .map(|i| MetricRecord::gauge_long(format!("org.test.{}.g{}", label, i), i as i64))
        .collect();
    ReportMetrics::new(COLLECTED, metrics)
}

/// Bodies of every request the server received, in arrival order.
pub async fn received_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| String::from_utf8(r.body).unwrap())
        .collect()
}

//! Delivery of metric snapshots to Elasticsearch.
//!
//! Each report cycle renders one bulk payload and POSTs it to `/_bulk`. A
//! payload that cannot be delivered is spooled to disk; after the next
//! successful send the spool is replayed oldest first. Replay stops at the
//! first failure so payloads are never delivered out of order.
//!
//! Success is decided on the HTTP status alone. Item-level errors inside a
//! 200 bulk response are not inspected, so documents the cluster rejects
//! individually are not retried.

pub mod template;

pub use template::TemplateApply;

use crate::core::{normalise_url, ReporterConfig, ReporterError, Result};
use crate::export::{today_suffix, BulkEncoder};
use crate::metrics::ReportMetrics;
use crate::spool::{Spool, SpoolEntry};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Something that ships collected metrics somewhere.
#[async_trait]
pub trait MetricReporter: Send + Sync {
    /// Report one collection interval. Never fails; delivery problems are
    /// handled internally.
    async fn report(&self, metrics: &ReportMetrics);

    /// Release resources at shutdown.
    async fn cleanup(&self) {}
}

/// What happened while replaying the spool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// Payloads resent successfully
    pub sent: usize,
    /// Payloads still waiting
    pub remaining: usize,
    /// True if replay stopped early because a payload failed
    pub halted: bool,
}

/// What happened during one report cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to report, no network call made
    Empty,
    /// Rendering failed, nothing sent or spooled
    EncodeFailed,
    /// Payload delivered, followed by a spool replay
    Sent(ReplayOutcome),
    /// Delivery failed and the payload was spooled
    Spooled,
    /// Delivery failed and the payload could not be spooled either
    Lost,
}

/// Reporter that sends bulk payloads over HTTP and spools failures to disk.
#[derive(Debug)]
pub struct ElasticReporter {
    config: Arc<ReporterConfig>,
    client: Client,
    bulk_url: String,
    spool: Spool,
    /// Serialises send, spool and replay between concurrent cycles
    cycle: Mutex<()>,
}

impl ElasticReporter {
    /// Create a reporter with an HTTP client built from the configured timeouts.
    pub async fn new(config: ReporterConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        Self::with_client(config, client).await
    }

    /// Create a reporter using a caller supplied HTTP client.
    ///
    /// Fails if the spool directory cannot be created. The index template
    /// check runs once here; its outcome never fails construction.
    pub async fn with_client(mut config: ReporterConfig, client: Client) -> Result<Self> {
        // Struct literals bypass the builder
        config.url = normalise_url(&config.url);
        config.validate()?;
        let spool = Spool::open(&config.directory)?;

        TemplateApply::new(
            client.clone(),
            &config.url,
            config.template_name.clone(),
            config.template_dir.clone(),
        )
        .ensure_template()
        .await;

        tracing::info!(
            url = %config.url,
            spool = %config.directory.display(),
            "Elastic metrics reporter ready"
        );

        Ok(Self {
            bulk_url: config.bulk_url(),
            config: Arc::new(config),
            client,
            spool,
            cycle: Mutex::new(()),
        })
    }

    /// The configuration this reporter was built with
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// The spool holding undelivered payloads
    pub fn spool(&self) -> &Spool {
        &self.spool
    }

    /// Url payloads are POSTed to
    pub fn bulk_url(&self) -> &str {
        &self.bulk_url
    }

    /// Run one report cycle against today's index.
    pub async fn run_cycle(&self, metrics: &ReportMetrics) -> CycleOutcome {
        self.run_cycle_with_suffix(metrics, &today_suffix()).await
    }

    /// Run one report cycle against `<index_prefix><index_suffix>`.
    pub async fn run_cycle_with_suffix(
        &self,
        metrics: &ReportMetrics,
        index_suffix: &str,
    ) -> CycleOutcome {
        if metrics.is_empty() {
            return CycleOutcome::Empty;
        }

        let encoder = BulkEncoder::new(&self.config, index_suffix);
        let payload = match encoder.render_to_string(metrics) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(metrics = metrics.len(), "Failed to write bulk JSON for metrics: {}", e);
                return CycleOutcome::EncodeFailed;
            },
        };

        // Every record may have been skipped as idle
        if payload.is_empty() {
            return CycleOutcome::Empty;
        }

        let _guard = self.cycle.lock().await;
        match self.send(&payload).await {
            Ok(()) => CycleOutcome::Sent(self.replay_locked().await),
            Err(e) => {
                log_send_failure(&self.bulk_url, payload.len(), &e);
                self.spool_payload(&payload).await
            },
        }
    }

    /// Resend spooled payloads now, oldest first.
    pub async fn replay_pending(&self) -> ReplayOutcome {
        let _guard = self.cycle.lock().await;
        self.replay_locked().await
    }

    /// POST a payload once. Transport errors and non-2xx statuses are errors.
    pub async fn send(&self, payload: &str) -> Result<()> {
        tracing::trace!(url = %self.bulk_url, "Sending:\n{}", payload);

        let response = self
            .client
            .post(&self.bulk_url)
            .header(reqwest::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| ReporterError::from_transport(e, self.config.request_timeout()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ReporterError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::trace!(status = status.as_u16(), "Bulk response - {}", body);
        Ok(())
    }

    /// Replay the spool; the cycle lock must be held.
    async fn replay_locked(&self) -> ReplayOutcome {
        let entries = match self.spool.list_pending().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to list queued metrics files: {}", e);
                return ReplayOutcome::default();
            },
        };

        let mut outcome = ReplayOutcome {
            remaining: entries.len(),
            ..ReplayOutcome::default()
        };

        for entry in &entries {
            if let Err(e) = self.resend(entry).await {
                tracing::warn!(
                    file = %entry.id,
                    category = e.category(),
                    "Failed to send queued metrics file: {}",
                    e
                );
                outcome.halted = true;
                break;
            }
            outcome.sent += 1;
            outcome.remaining -= 1;
        }

        outcome
    }

    /// Send one spooled payload without triggering a nested replay.
    async fn resend(&self, entry: &SpoolEntry) -> Result<()> {
        let payload = self.spool.read(entry).await?;
        self.send(&payload).await?;

        match self.spool.remove(entry).await {
            Ok(()) => tracing::info!(file = %entry.id, "Sent queued metrics file"),
            Err(e) => tracing::error!(
                file = %entry.id,
                "Sent but unable to delete queued metrics file, possible duplicate metrics: {}",
                e
            ),
        }
        Ok(())
    }

    async fn spool_payload(&self, payload: &str) -> CycleOutcome {
        match self.spool.persist(payload).await {
            Ok(entry) => {
                tracing::info!(file = %entry.id, bytes = payload.len(), "Metrics queued to be sent later");
                CycleOutcome::Spooled
            },
            Err(e) => {
                tracing::error!(
                    bytes = payload.len(),
                    "Failed to store metrics file for resending, metrics lost: {}",
                    e
                );
                CycleOutcome::Lost
            },
        }
    }
}

#[async_trait]
impl MetricReporter for ElasticReporter {
    async fn report(&self, metrics: &ReportMetrics) {
        self.run_cycle(metrics).await;
    }
}

/// HTTP client with connect and whole-request timeouts from the config.
pub fn build_client(config: &ReporterConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| ReporterError::config(format!("Failed to build HTTP client: {}", e)))
}

fn log_send_failure(url: &str, bytes: usize, error: &ReporterError) {
    if error.is_recoverable() {
        tracing::info!(
            url,
            bytes,
            category = error.category(),
            "Connection error sending metrics to server: {}",
            error
        );
    } else {
        tracing::warn!(
            url,
            bytes,
            category = error.category(),
            "Unsuccessful sending metrics payload to server: {}",
            error
        );
    }
}

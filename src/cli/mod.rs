//! Command-line interface for operating a metrics spool.
//!
//! The reporter itself runs inside the application that owns the metric
//! registry. This binary covers the operator side: validating a config,
//! installing the index template, and draining payloads left in the spool.

use crate::core::{ConfigBuilder, ReporterConfig, ReporterError, Result};
use crate::reporter::{build_client, ElasticReporter, TemplateApply};
use crate::spool::Spool;
use clap::Parser;
use std::path::PathBuf;

/// Ship spooled metric payloads to Elasticsearch
#[derive(Parser, Debug)]
#[command(name = "elastic-metrics")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/elastic-metrics/config.yaml)
    #[arg(short, long, env = "ELASTIC_METRICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Elasticsearch base url
    #[arg(long, env = "ELASTIC_METRICS_URL")]
    pub url: Option<String>,

    /// Spool directory holding undelivered payloads
    #[arg(long, env = "ELASTIC_METRICS_SPOOL_DIR")]
    pub spool_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "ELASTIC_METRICS_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Install the index template if the cluster does not have it
    #[arg(long)]
    pub apply_template: bool,

    /// Resend spooled payloads now
    #[arg(long)]
    pub flush: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<ReporterConfig> {
        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            Some(path.clone())
        } else {
            dirs::config_dir()
                .map(|d| d.join("elastic-metrics").join("config.yaml"))
                .filter(|p| p.exists())
        };

        if let Some(path) = config_path {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    builder = builder.from_yaml(&content)?;
                    tracing::info!("Loaded configuration from: {:?}", path);
                },
                Err(e) => {
                    return Err(ReporterError::config(format!(
                        "Failed to read config file {:?}: {}",
                        path, e
                    )));
                },
            }
        } else {
            tracing::debug!("No config file found, using defaults");
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<ReporterConfig> {
        if let Some(url) = &self.url {
            builder = builder.url(url);
        }
        if let Some(dir) = &self.spool_dir {
            builder = builder.directory(dir.clone());
        }
        builder.build()
    }

    /// Initialize logging.
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level =
            std::env::var("ELASTIC_METRICS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init()
            .map_err(|e| ReporterError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the requested action.
pub async fn execute(cli: Cli) -> Result<()> {
    cli.init_logging()?;

    let config = cli.load_config().await?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Url: {}", config.url);
        println!("  Index: {}<yyyy.MM.dd> ({})", config.index_prefix, config.index_type);
        println!(
            "  Template: {}",
            config.template_name.as_deref().unwrap_or("<disabled>")
        );
        println!("  Spool directory: {}", config.directory.display());
        return Ok(());
    }

    if cli.apply_template {
        let client = build_client(&config)?;
        let applied = TemplateApply::new(
            client,
            &config.url,
            config.template_name.clone(),
            config.template_dir.clone(),
        )
        .ensure_template()
        .await;
        println!("Template installed: {}", applied);
        return Ok(());
    }

    if cli.flush {
        let reporter = ElasticReporter::new(config).await?;
        let outcome = reporter.replay_pending().await;
        println!("Resent {} payload(s), {} still queued", outcome.sent, outcome.remaining);
        if outcome.halted {
            println!("Replay stopped at the first failed payload; retry later");
        }
        return Ok(());
    }

    let spool = Spool::open(&config.directory)?;
    let pending = spool.pending_count().await?;
    println!("{} payload(s) queued in {}", pending, spool.directory().display());
    Ok(())
}

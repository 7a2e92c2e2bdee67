#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod shutdown;

use std::process;

use anyhow::Context;
use clap::Parser;
use conveyor_engine::{EngineConfig, EngineState, spawn_workers};
use conveyor_postgres::PgClientExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "conveyor_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "conveyor_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "conveyor_cli::config";

/// Complete CLI configuration.
///
/// All configuration can be provided via CLI arguments or environment
/// variables. Use `--help` to see all available options.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "conveyor")]
#[command(about = "Conveyor deployment workflow engine")]
#[command(version)]
pub struct Cli {
    /// Engine configuration: database, message bus, release drivers, and
    /// behavior knobs.
    #[clap(flatten)]
    pub engine: EngineConfig,
}

impl Cli {
    /// Loads environment variables from .env (if enabled) and parses CLI
    /// arguments.
    ///
    /// The .env file is loaded before clap parses arguments so that its
    /// variables can serve as argument defaults.
    fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env if the dotenv feature is
    /// enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}
}

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "engine terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "engine terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    init_tracing();
    log_startup_info();

    cli.engine
        .validate()
        .context("invalid engine configuration")?;
    log_engine_config(&cli.engine);

    if cli.engine.expose_cd_metrics {
        init_metrics();
    }

    let state = EngineState::from_config(&cli.engine)
        .await
        .context("failed to initialize engine state")?;

    let migration = state
        .postgres
        .run_pending_migrations()
        .await
        .context("failed to apply database migrations")?;
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        applied = migration.processed_versions.len(),
        "Database schema up to date"
    );

    let cancel_token = CancellationToken::new();
    let handles = spawn_workers(state, cancel_token.clone())
        .await
        .context("failed to spawn engine workers")?;

    shutdown::shutdown_signal().await;
    cancel_token.cancel();

    handles
        .join_all()
        .await
        .context("engine workers failed during shutdown")?;

    Ok(())
}

/// Initializes tracing with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Installs the Prometheus metrics exporter.
fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(err) = builder.install() {
        tracing::warn!(
            target: TRACING_TARGET_STARTUP,
            error = %err,
            "Failed to install Prometheus exporter"
        );
    }
}

/// Logs startup information.
fn log_startup_info() {
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting conveyor engine"
    );

    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        pid = process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        features = ?enabled_features(),
        "build information"
    );
}

/// Logs engine configuration (no sensitive information).
fn log_engine_config(config: &EngineConfig) {
    tracing::info!(
        target: TRACING_TARGET_CONFIG,
        max_concurrent_jobs = config.max_concurrent_jobs,
        helm_sweep_interval_secs = config.helm_sweep_interval_secs,
        argocd_sweep_interval_secs = config.argocd_sweep_interval_secs,
        degradation_sweep_interval_secs = config.degradation_sweep_interval_secs,
        ci_auto_trigger_batch_size = config.ci_auto_trigger_batch_size,
        workflow_retries_enabled = config.workflow_retries_enabled,
        max_cd_workflow_runner_retries = config.max_cd_workflow_runner_retries,
        argocd_auto_sync_enabled = config.argocd_auto_sync_enabled,
        expose_cd_metrics = config.expose_cd_metrics,
        "engine configuration"
    );
}

/// Returns a list of enabled compile-time features.
fn enabled_features() -> Vec<&'static str> {
    [cfg!(feature = "dotenv").then_some("dotenv")]
        .into_iter()
        .flatten()
        .collect()
}

//! spmirror Daemon - Background synchronization service
//!
//! This binary mirrors the configured SharePoint document libraries into
//! their local caches:
//! - `spmirrord --once` performs a single mirror run and exits
//! - `spmirrord` arms the fixed-rate scheduler and runs until SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon loads the configuration, wires the Graph provider and the
//! sync controller together, and either runs the controller once or hands
//! it to the scheduler. Shutdown is driven by a `CancellationToken`
//! triggered from the signal handler.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spmirror_core::config::Config;
use spmirror_core::ports::notification::{ISyncObserver, SyncEvent};
use spmirror_graph::client::GraphClient;
use spmirror_graph::connection::GraphConnection;
use spmirror_graph::provider::GraphDirectoryProvider;
use spmirror_sync::controller::SyncController;
use spmirror_sync::schedule::{ScheduleSpec, SyncScheduler};

#[derive(Debug, Parser)]
#[command(name = "spmirrord", version, about = "SharePoint to local cache mirror")]
struct Cli {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single mirror pass and exit instead of scheduling
    #[arg(long)]
    once: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Default observer: every sync event goes to the log.
struct LogObserver;

impl ISyncObserver for LogObserver {
    fn notify(&self, event: &SyncEvent) {
        info!(kind = %event.kind, path = %event.path.display(), "Sync event");
    }
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing: RUST_LOG wins, then -v flags, then the config default.
    let filter = match cli.verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    };

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let default_level = filter.unwrap_or(config.logging.level.as_str()).to_string();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(config = %config_path.display(), "spmirror daemon starting (spmirrord)");

    let errors = config.validate();
    if !errors.is_empty() {
        for err in &errors {
            error!("Configuration error: {err}");
        }
        anyhow::bail!("Invalid configuration ({} error(s))", errors.len());
    }

    // Wire the Graph provider and the controller.
    let connection = Arc::new(GraphConnection::new(
        &config.tenant_id,
        config.client_id.clone(),
        config.secret.clone(),
    )?);
    let client = GraphClient::new(connection);
    let provider = Arc::new(GraphDirectoryProvider::new(client, config.host.clone()));

    let schedule = config.sync.clone();
    let controller = Arc::new(SyncController::new(
        Arc::new(config),
        provider,
        Arc::new(LogObserver),
    ));

    if cli.once {
        if let Some(summary) = controller.run().await? {
            info!(
                downloaded = summary.files_downloaded,
                updated = summary.files_updated,
                deleted = summary.files_deleted,
                failures = summary.failures,
                duration_ms = summary.duration_ms,
                "Single mirror run finished"
            );
        }
        return Ok(());
    }

    let Some(spec) = ScheduleSpec::parse(&schedule) else {
        anyhow::bail!(
            "Scheduling is disabled by the configuration (sync.start_time / sync.interval); \
             use --once for a one-shot run"
        );
    };

    let mut scheduler = SyncScheduler::new();
    scheduler.start(spec, Arc::clone(&controller));

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));
    shutdown.cancelled().await;

    scheduler.cancel();
    info!("spmirror daemon shut down gracefully");
    Ok(())
}

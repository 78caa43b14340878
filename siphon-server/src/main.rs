//! Siphon server binary: load config, open the pool, apply schema, serve.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use siphon_core::metrics::IngestCounters;
use siphon_core::{ConnectionPool, SiphonConfig, TableRegistry};

use siphon_server::Listener;

#[derive(Parser)]
#[command(name = "siphon-server", about = "UDP telemetry ingestion server")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(long, default_value = "siphon.toml", env = "SIPHON_CONFIG")]
    config: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config, "loading configuration");
    let config = match SiphonConfig::from_file(std::path::Path::new(&cli.config)) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let registry = match TableRegistry::from_config(&config.tables) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            tracing::error!(error = %e, "failed to build table registry");
            std::process::exit(1);
        }
    };
    tracing::info!(tables = registry.len(), "table registry built");

    let pool = match ConnectionPool::open(&config.database.path, &config.database) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database pool");
            std::process::exit(1);
        }
    };
    if let Err(e) = registry.apply_schema(&pool.checkout()) {
        tracing::error!(error = %e, "failed to apply schema");
        std::process::exit(1);
    }

    let counters = Arc::new(IngestCounters::new());
    let listener = match Listener::bind(
        &config.server.bind,
        pool,
        Arc::clone(&registry),
        Arc::clone(&counters),
        config.server.max_datagram_bytes,
    )
    .await
    {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, bind = %config.server.bind, "failed to bind socket");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener_task = tokio::spawn(listener.run(shutdown_rx));

    tracing::info!("siphon-server started, press Ctrl+C to stop");

    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to register SIGTERM handler");
            std::process::exit(1);
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down...");
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, shutting down...");
        }
    }

    // Stop accepting; in-flight workers drain with the blocking pool.
    let _ = shutdown_tx.send(true);
    let _ = listener_task.await;

    let snap = counters.snapshot();
    tracing::info!(
        received = snap.datagrams_received,
        stored = snap.rows_stored,
        captured = snap.rows_captured,
        lost = snap.rows_lost,
        "siphon-server stopped"
    );
}

//! Process bootstrap (spec §1 "out of scope", expanded at §4.6-§4.8):
//! load settings, init telemetry, run the store migration, build the
//! chain client and store pool, then run the Query API and the Sync
//! Engine side by side until a shutdown signal arrives.
//!
//! Grounded on the teacher's `main.rs` (`#[tokio::main]`, `tokio::spawn`
//! for the web server alongside a background service) and
//! original_source's `src/main.py` (a background thread running the sync
//! engine alongside the API server in the same process) — translated here
//! into two `tokio::spawn`ed tasks joined by a cooperative shutdown flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use evm_sync_indexer::chain_client::ChainClient;
use evm_sync_indexer::settings::Settings;
use evm_sync_indexer::sync::SyncEngine;
use evm_sync_indexer::{metrics, query_api, telemetry};

/// The indexer is otherwise entirely env-configured (spec §6); these flags
/// are operational escape hatches for deploy tooling, not part of the
/// config surface the Sync Engine reads.
#[derive(Debug, Parser)]
struct Cli {
    /// Run pending store migrations and exit without starting the sync loop.
    #[arg(long)]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load()?;

    telemetry::init_tracing(telemetry::TelemetryConfig {
        log_format: settings.log_format.clone(),
        log_file: settings.log_file.clone(),
    })?;
    metrics::init_metrics()?;

    info!("connecting to store");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    if cli.migrate_only {
        info!("migrations applied, exiting (--migrate-only)");
        return Ok(());
    }

    let client = ChainClient::new(&settings.rpc_url, settings.retry_max_attempts)?;

    let running = Arc::new(AtomicBool::new(true));
    let query_api_addr = settings.query_api_addr.clone();
    let query_pool = pool.clone();

    let query_api_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(&query_api_addr).await?;
        info!(addr = %query_api_addr, "query api listening");
        axum::serve(listener, query_api::router(query_pool)).await
    });

    let engine = SyncEngine::new(settings, client, pool, running.clone());
    let sync_handle = tokio::spawn(async move {
        if let Err(err) = engine.run().await {
            error!(error = %err, "sync engine exited with an unrecoverable error");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        result = sync_handle => {
            if let Err(join_err) = result {
                error!(error = %join_err, "sync engine task panicked");
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    query_api_handle.abort();

    Ok(())
}

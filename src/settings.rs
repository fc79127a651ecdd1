//! Configuration surface (spec §4.6, §6), resolved once at startup into an
//! immutable record and passed explicitly into every component's
//! constructor. No module-level global config cell.

use std::time::Duration;

use crate::error::{IndexerError, IndexerResult};

#[derive(Debug, Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub database_url: String,
    pub retry_max_attempts: u32,
    pub buffer_size: usize,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub tip_margin: u64,
    pub prefetch_workers: usize,
    /// `None` means "derive from head - tip_margin"; `Some(0)` means an
    /// explicit opt-in full backfill from genesis. These are deliberately
    /// distinct states (spec §9 Open Question).
    pub default_start_height: Option<u64>,
    pub query_api_addr: String,
    pub log_format: String,
    pub log_file: Option<String>,
}

fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    /// Load from process environment, optionally seeded by a local `.env`
    /// file. `RPC_URL` and `DATABASE_URL` are required; everything else
    /// falls back to its documented default. A missing required variable or
    /// an unparseable required value is an unrecoverable setup failure.
    pub fn load() -> IndexerResult<Self> {
        // Best-effort: local development convenience only, never required.
        let _ = dotenvy::dotenv();

        let rpc_url = std::env::var("RPC_URL")
            .map_err(|_| IndexerError::Config("RPC_URL is required".into()))?;
        if rpc_url.trim().is_empty() {
            return Err(IndexerError::Config("RPC_URL must not be empty".into()));
        }

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| IndexerError::Config("DATABASE_URL is required".into()))?;
        if database_url.trim().is_empty() {
            return Err(IndexerError::Config("DATABASE_URL must not be empty".into()));
        }

        let default_start_height = std::env::var("DEFAULT_START_HEIGHT")
            .ok()
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    IndexerError::Config(format!("DEFAULT_START_HEIGHT must be a u64, got {v}"))
                })
            })
            .transpose()?;

        Ok(Self {
            rpc_url,
            database_url,
            retry_max_attempts: env_or_default("RETRY_MAX_ATTEMPTS", 5),
            buffer_size: env_or_default("BUFFER_SIZE", 10),
            poll_interval: Duration::from_secs(env_or_default("POLL_INTERVAL_SECS", 5)),
            error_backoff: Duration::from_secs(env_or_default("ERROR_BACKOFF_SECS", 2)),
            tip_margin: env_or_default("TIP_MARGIN", 5),
            prefetch_workers: env_or_default("PREFETCH_WORKERS", 5),
            default_start_height,
            query_api_addr: std::env::var("QUERY_API_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            log_file: std::env::var("LOG_FILE").ok(),
        })
    }
}

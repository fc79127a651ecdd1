//! Structured logging, initialized once at startup (spec §4.7).
//!
//! Kept near-verbatim from the teacher's `telemetry.rs`: registry +
//! `EnvFilter` + pretty/JSON `fmt::layer()`, with an optional daily-rotating
//! file sink alongside stderr. Env var names narrowed to this crate's
//! configuration surface (`LOG_FORMAT`, `LOG_FILE`) and the PIVX-specific
//! truncation/progress-sampling helpers dropped along with their only
//! callers.

use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_format: String,
    pub log_file: Option<String>,
}

pub fn init_tracing(config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file_path) = config.log_file {
        let path = std::path::Path::new(&log_file_path);
        let directory = path.parent().ok_or("invalid log file path: no parent directory")?;
        let filename_prefix = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or("invalid log file path: no filename")?;

        let file_appender = rolling::daily(directory, filename_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if config.log_format == "json" {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true).with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(non_blocking),
                )
                .init();
        }

        // The subscriber must outlive `main` for buffered log lines to flush.
        std::mem::forget(guard);
    } else if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_file(true).with_line_number(true))
            .init();
    }

    Ok(())
}

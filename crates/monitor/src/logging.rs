use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Log file name prefix inside `log_dir`; the daily roller appends the date.
const LOG_FILE_NAME: &str = "monitor.log";

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "lending_monitor=info,warn";

/// Initialise the global tracing subscriber.
///
/// JSON lines go to a daily rolling file under `log_dir`; a compact
/// human-readable layer goes to stderr. Returns a [`WorkerGuard`] that
/// **must** be held for the lifetime of the process, dropping it flushes and
/// closes the log file writer.
pub fn init_tracing(logging: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&logging.log_dir)
        .with_context(|| format!("failed to create log directory {}", logging.log_dir))?;

    let file_appender = tracing_appender::rolling::daily(&logging.log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .json(),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init()
        .context("tracing subscriber already initialised")?;

    Ok(guard)
}

use crate::error::ConfigError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. "info") is
/// used. Output goes to stdout through a non-blocking writer, so the returned
/// guard must be held for the lifetime of the process to flush on exit.
pub fn init_tracing(default_directive: &str) -> Result<WorkerGuard, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    Ok(guard)
}

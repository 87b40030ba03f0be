//! Tracing subscriber setup for binaries and tests embedding the runtime.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
}

/// Installs a subscriber that writes to `dir/file_name` through a
/// non-blocking writer.
///
/// Keep the returned guard alive; dropping it flushes and stops the writer.
pub fn init_tracing_with_file(
    dir: impl AsRef<Path>,
    file_name: &str,
) -> Result<WorkerGuard, TryInitError> {
    let file_appender = tracing_appender::rolling::never(dir.as_ref(), file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok(guard)
}

//! Tracing setup for the `maestro` binary.
//!
//! Filter comes from `RUST_LOG`, defaulting to `info` (`debug` with `--verbose`). When
//! `MAESTRO_LOG_FILE` is set, logs go to that file through a non-blocking appender; otherwise
//! to stderr so stdout stays clean for JSON output.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_FILE: &str = "MAESTRO_LOG_FILE";

/// Installs the global subscriber. Keep the returned guard alive until exit so buffered
/// file output is flushed.
pub fn init(verbose: bool) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match std::env::var(ENV_LOG_FILE).ok().filter(|p| !p.trim().is_empty()) {
        Some(path) => {
            let path = Path::new(&path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| format!("{ENV_LOG_FILE} has no file name"))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
            Ok(None)
        }
    }
}

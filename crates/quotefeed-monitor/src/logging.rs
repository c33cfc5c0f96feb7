//! Logging setup.

use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter {0:?}: {1}")]
    Filter(String, String),

    #[error("Cannot open log file {0:?}: {1}")]
    File(String, String),

    #[error("Logging already initialized: {0}")]
    Init(String),
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Console output is pretty or
/// JSON; when `file` is set, JSON lines are also written there with daily
/// rotation. The returned guard flushes the file writer on drop and must be
/// held for the life of the process.
pub fn setup_logging(
    level: &str,
    json: bool,
    file: Option<&Path>,
) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| LoggingError::Filter(level.to_string(), e.to_string()))?,
    };

    let console = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().pretty().boxed()
    };

    let (file_layer, guard) = match file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}

/// Daily-rotated non-blocking writer. `path` names the file prefix; its
/// parent directory is created if missing.
fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let display = path.display().to_string();
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoggingError::File(display.clone(), "missing file name".into()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .build(dir)
        .map_err(|e| LoggingError::File(display, e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}

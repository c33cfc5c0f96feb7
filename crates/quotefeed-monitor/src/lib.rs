//! Logging setup for the quote feed binaries.

mod logging;

pub use logging::{setup_logging, LoggingError};
pub use tracing_appender::non_blocking::WorkerGuard;

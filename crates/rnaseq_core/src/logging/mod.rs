//! Logging for pipeline runs.
//!
//! Two layers:
//! - `tracing` for library diagnostics, installed once by the binary with
//!   [`init_tracing`] or [`init_tracing_with_file`]
//! - [`JobLogger`], the per-run log holding stage markers, command lines
//!   and external tool output
//!
//! # Example
//!
//! ```no_run
//! use rnaseq_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("S1", "/path/to/logs", LogConfig::default(), None)?;
//!
//! logger.stage("Align");
//! logger.command("bowtie2 -X 1000 -p 8 ...");
//! logger.success("Align completed");
//! # Ok::<(), std::io::Error>(())
//! ```

mod job_logger;
mod types;

use std::path::Path;

pub use job_logger::{JobLogger, JobLoggerBuilder};
pub use types::{LineKind, LogCallback, LogConfig, LogLevel};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name of the application log inside the logs directory.
pub const APP_LOG_FILE: &str = "rnaseq-pipeline.log";

/// `RUST_LOG` when set, otherwise `default_level`.
fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_filter()))
}

/// Install the global subscriber writing to stderr.
///
/// Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

/// Like [`init_tracing`], plus a non-blocking copy in
/// `<log_dir>/rnaseq-pipeline.log`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes the file writer.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    log_dir: &Path,
) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, APP_LOG_FILE));

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}

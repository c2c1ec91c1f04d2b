//! Runner options, outcomes and the output sink seam.

use std::process::ExitStatus;
use std::time::Duration;

use crate::logging::JobLogger;
use crate::orchestrator::CancelHandle;

/// Per-invocation execution limits.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Kill the process once it has run this long.
    pub timeout: Option<Duration>,
    /// How often the child is checked for exit, deadline and cancellation.
    pub poll_interval: Duration,
    pub cancel: Option<CancelHandle>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(100),
            cancel: None,
        }
    }
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
    }
}

/// How a process that ran to completion exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code; signal terminations map to `128 + signal`.
    pub code: i32,
    pub duration: Duration,
}

impl ExitOutcome {
    pub fn new(code: i32, duration: Duration) -> Self {
        Self { code, duration }
    }

    pub fn from_status(status: ExitStatus, duration: Duration) -> Self {
        Self::new(status_code(status), duration)
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[cfg(unix)]
fn status_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn status_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Receives tool output line by line while a process runs.
pub trait OutputSink: Send + Sync {
    fn line(&self, line: &str, is_stderr: bool);
}

impl OutputSink for JobLogger {
    fn line(&self, line: &str, is_stderr: bool) {
        self.output_line(line, is_stderr);
    }
}

/// Discards all output.
pub struct NullSink;

impl OutputSink for NullSink {
    fn line(&self, _line: &str, _is_stderr: bool) {}
}

//! Process execution errors.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure to run an external process to completion.
///
/// A nonzero exit is not an error at this level; see
/// [`ExitOutcome`](super::ExitOutcome).
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exceeded its deadline of {}s and was killed", after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("'{program}' was cancelled")]
    Cancelled { program: String },

    #[error("I/O error while waiting for '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn timeout(program: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            program: program.into(),
            after,
        }
    }

    pub fn cancelled(program: impl Into<String>) -> Self {
        Self::Cancelled {
            program: program.into(),
        }
    }

    pub fn io(program: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            program: program.into(),
            source,
        }
    }
}

pub type RunResult<T> = Result<T, RunError>;

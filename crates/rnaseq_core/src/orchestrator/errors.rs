//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Stage → Operation → Detail

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::command::ConfigurationError;
use crate::runner::RunError;
use crate::samples::ResolutionError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage failed during execution.
    #[error("Run '{job_name}' failed at stage '{stage_name}': {source}")]
    StageFailed {
        job_name: String,
        stage_name: String,
        #[source]
        source: StepError,
    },

    /// Read files could not be resolved.
    #[error("Run '{job_name}' could not resolve its read files: {source}")]
    Resolution {
        job_name: String,
        #[source]
        source: ResolutionError,
    },

    /// A stage command could not be built.
    #[error("Run '{job_name}' has an invalid configuration: {source}")]
    Configuration {
        job_name: String,
        #[source]
        source: ConfigurationError,
    },

    /// Another run holds the output lock.
    #[error("Run '{job_name}' cannot start: {} is held by another run", lock_path.display())]
    OutputLocked { job_name: String, lock_path: PathBuf },

    /// Pipeline was cancelled.
    #[error("Run '{job_name}' was cancelled")]
    Cancelled { job_name: String },

    /// Failed to set up the run (create directories, etc.).
    #[error("Run '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },
}

impl PipelineError {
    pub fn stage_failed(
        job_name: impl Into<String>,
        stage_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StageFailed {
            job_name: job_name.into(),
            stage_name: stage_name.into(),
            source,
        }
    }

    pub fn resolution(job_name: impl Into<String>, source: ResolutionError) -> Self {
        Self::Resolution {
            job_name: job_name.into(),
            source,
        }
    }

    pub fn configuration(job_name: impl Into<String>, source: ConfigurationError) -> Self {
        Self::Configuration {
            job_name: job_name.into(),
            source,
        }
    }

    pub fn output_locked(job_name: impl Into<String>, lock_path: impl Into<PathBuf>) -> Self {
        Self::OutputLocked {
            job_name: job_name.into(),
            lock_path: lock_path.into(),
        }
    }

    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(job_name: impl Into<String>) -> Self {
        Self::Cancelled {
            job_name: job_name.into(),
        }
    }

    /// Name of the failing stage, if a stage failed.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::StageFailed { stage_name, .. } => Some(stage_name),
            _ => None,
        }
    }

    /// Process exit status for this failure.
    ///
    /// A tool's own nonzero exit code is passed through; everything else is 1.
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::StageFailed {
                source: StepError::CommandFailed { exit_code, .. },
                ..
            } if *exit_code != 0 => *exit_code,
            _ => 1,
        }
    }
}

/// Error from a pipeline stage with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// A declared input exists but cannot be used as one.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// A declared output was not produced.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// An external command exited nonzero.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// An external command ran past its deadline.
    #[error("{tool} timed out after {}s", after.as_secs())]
    Timeout { tool: String, after: Duration },

    /// Cancelled while the stage's command was running.
    #[error("{tool} was cancelled")]
    Cancelled { tool: String },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn timeout(tool: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            after,
        }
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }
}

impl From<RunError> for StepError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Spawn { program, source } => {
                Self::io_error(format!("starting {}", program), source)
            }
            RunError::Timeout { program, after } => Self::timeout(program, after),
            RunError::Cancelled { program } => Self::Cancelled { tool: program },
            RunError::Io { program, source } => {
                Self::io_error(format!("waiting for {}", program), source)
            }
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

//! Container lifecycle errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;


/// Failure in one phase of a container job.
///
/// Every variant names the container so leftovers can be found by hand.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Could not prepare container job '{container_id}': {message}")]
    Setup {
        container_id: String,
        message: String,
    },

    #[error("Could not create container '{container_id}': {message}")]
    Create {
        container_id: String,
        message: String,
    },

    /// The workload inside the container failed or could not be run.
    #[error("Container '{container_id}' failed: {message}")]
    ContainerExecution {
        container_id: String,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("Could not copy '{artifact}' out of container '{container_id}': {message}")]
    ArtifactExtraction {
        container_id: String,
        artifact: String,
        message: String,
    },

    #[error("Could not fix permissions on {}: {source}", path.display())]
    PermissionNormalization {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not move {} to {}: {source}", from.display(), to.display())]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not remove container '{container_id}': {message}")]
    Teardown {
        container_id: String,
        message: String,
    },
}

impl ContainerError {
    pub fn setup(container_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            container_id: container_id.into(),
            message: message.into(),
        }
    }

    pub fn create(container_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Create {
            container_id: container_id.into(),
            message: message.into(),
        }
    }

    pub fn execution(
        container_id: impl Into<String>,
        exit_code: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self::ContainerExecution {
            container_id: container_id.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn extraction(
        container_id: impl Into<String>,
        artifact: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ArtifactExtraction {
            container_id: container_id.into(),
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    pub fn permissions(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PermissionNormalization {
            path: path.into(),
            source,
        }
    }

    pub fn relocation(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Relocation {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    pub fn teardown(container_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Teardown {
            container_id: container_id.into(),
            message: message.into(),
        }
    }

    /// Process exit status for this failure: the workload's own code when
    /// it exited nonzero, otherwise 1.
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::ContainerExecution {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

pub type ContainerResult<T> = Result<T, ContainerError>;

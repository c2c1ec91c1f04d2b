//! Container job description and report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::Invocation;
use crate::models::MountMode;

/// Host directory projected into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    pub host_path: PathBuf,
    pub container_path: String,
    pub mode: MountMode,
}

impl MountSpec {
    pub fn read_only(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            mode: MountMode::ReadOnly,
        }
    }

    pub fn read_write(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            mode: MountMode::ReadWrite,
        }
    }

    /// Value for the runtime's `-v` flag.
    pub fn volume_arg(&self) -> String {
        let mut arg = format!("{}:{}", self.host_path.display(), self.container_path);
        if self.mode == MountMode::ReadOnly {
            arg.push_str(":ro");
        }
        arg
    }
}

/// Everything needed to run one workload in a throwaway container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerJob {
    /// Short label used in the container name (e.g. `align`).
    pub purpose: String,
    pub image: String,
    pub mounts: Vec<MountSpec>,
    /// Command run inside the container.
    pub inner: Invocation,
    /// Directory inside the container holding the artifacts.
    pub container_output_dir: String,
    /// Artifact names, relative to `container_output_dir`.
    pub artifacts: Vec<String>,
    /// Host directory under which each run stages its artifacts, in a
    /// subdirectory named after the container.
    pub staging_dir: PathBuf,
    /// Host directory the artifacts end up in.
    pub destination_dir: PathBuf,
}

impl ContainerJob {
    /// `<container_output_dir>/<artifact>` as the runtime's `cp` expects.
    pub fn container_artifact_path(&self, artifact: &str) -> String {
        format!("{}/{}", self.container_output_dir.trim_end_matches('/'), artifact)
    }

    /// Staging directory private to one container run.
    pub fn staging_area(&self, container_id: &str) -> PathBuf {
        self.staging_dir.join(container_id)
    }

    pub fn staged_path(&self, container_id: &str, artifact: &str) -> PathBuf {
        self.staging_area(container_id).join(artifact)
    }

    pub fn destination_path(&self, artifact: &str) -> PathBuf {
        self.destination_dir.join(artifact)
    }

    pub fn destination(&self) -> &Path {
        &self.destination_dir
    }
}

/// Lifecycle phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LifecycleState {
    Created,
    Running,
    ArtifactsExtracted,
    Relocated,
    TornDown,
}

/// Outcome of a successful container job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerReport {
    pub container_id: String,
    /// Exit code of the workload.
    pub exit_code: i32,
    /// Final artifact locations on the host.
    pub relocated: Vec<PathBuf>,
    /// Phases reached, in order.
    pub states: Vec<LifecycleState>,
}

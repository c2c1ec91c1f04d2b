//! Running a workflow inside a throwaway container.
//!
//! Lifecycle of one job:
//!
//! ```text
//! Created → Running → ArtifactsExtracted → Relocated → TornDown
//! ```
//!
//! The container is removed on every path once it has a name, including
//! when the workload or the artifact handling fails.

mod errors;
mod files;
mod jobs;
mod runner;
mod types;

pub use errors::{ContainerError, ContainerResult};
pub use files::{normalize_permissions, relocate};
pub use jobs::{alignment_job, diff_expression_job, ContainerAlignment, ContainerDiffExpression};
pub use runner::{container_id, ContainerRunner};
pub use types::{ContainerJob, ContainerReport, LifecycleState, MountSpec};

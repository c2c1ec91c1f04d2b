//! Pipeline stage trait definition.
//!
//! All stages implement this trait, providing a consistent interface for
//! command construction and file handoff checks.

use std::fs;
use std::path::PathBuf;

use super::errors::{StepError, StepResult};
use super::types::Context;
use crate::command::{ConfigurationResult, Invocation};

/// Trait for pipeline stages.
///
/// A stage owns one external command. The pipeline calls these methods in
/// order:
///
/// 1. `build_command` - for every stage, before anything runs
/// 2. `validate_input` - declared inputs must exist
/// 3. the built command is executed
/// 4. `validate_output` - declared outputs must exist
///
/// # Example
///
/// ```ignore
/// struct SortStep { paths: ArtifactPaths }
///
/// impl PipelineStep for SortStep {
///     fn name(&self) -> &str { "ConvertToIndexedBinary" }
///
///     fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation> {
///         Ok(ctx.builder().sort(&self.paths))
///     }
///
///     fn declared_inputs(&self) -> Vec<PathBuf> { vec![self.paths.sam()] }
///     fn declared_outputs(&self) -> Vec<PathBuf> { vec![self.paths.bam()] }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Stage name (for logging, deadlines and error context).
    fn name(&self) -> &str;

    /// Build the stage command. Must not touch the filesystem.
    fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation>;

    /// Files that must exist before the command starts.
    fn declared_inputs(&self) -> Vec<PathBuf>;

    /// Files or directories the command must leave behind.
    fn declared_outputs(&self) -> Vec<PathBuf>;

    /// Outputs consumed by a later stage and deleted after the run.
    fn transient_outputs(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        for path in self.declared_inputs() {
            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    return Err(StepError::invalid_input(format!(
                        "{} is a directory",
                        path.display()
                    )));
                }
                Ok(_) => {}
                Err(_) => return Err(StepError::file_not_found(path.display().to_string())),
            }
        }
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context) -> StepResult<()> {
        for path in self.declared_outputs() {
            if !path.exists() {
                return Err(StepError::invalid_output(format!(
                    "{} was not produced",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Human-readable description of what this stage does.
    fn description(&self) -> &str {
        self.name()
    }
}

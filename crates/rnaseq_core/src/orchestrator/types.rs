//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::command::CommandBuilder;
use crate::config::Settings;
use crate::logging::JobLogger;
use crate::runner::{CommandRunner, RunOptions};

use super::pipeline::CancelHandle;

/// Read-only context passed to pipeline stages.
///
/// Contains the run configuration and shared resources. Settings are
/// never modified during a run.
pub struct Context {
    /// Application settings.
    pub settings: Settings,
    /// Run name (usually the sample basename).
    pub job_name: String,
    /// Per-run logger.
    pub logger: Arc<JobLogger>,
    /// Process execution backend.
    pub runner: Arc<dyn CommandRunner>,
}

impl Context {
    pub fn new(
        settings: Settings,
        job_name: impl Into<String>,
        logger: Arc<JobLogger>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            settings,
            job_name: job_name.into(),
            logger,
            runner,
        }
    }

    pub fn builder(&self) -> CommandBuilder<'_> {
        CommandBuilder::new(&self.settings.pipeline, &self.settings.tools)
    }

    /// Execution limits for the named stage.
    pub fn run_options(&self, stage_name: &str, cancel: CancelHandle) -> RunOptions {
        RunOptions {
            timeout: self.settings.execution.timeout_for(stage_name),
            poll_interval: self.settings.execution.poll_interval(),
            cancel: Some(cancel),
        }
    }
}

/// One executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: String,
    /// Command line as logged.
    pub command: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// 0 on success.
    pub exit_status: i32,
    /// Stages in execution order.
    pub stages: Vec<StageRecord>,
    /// Final artifacts left on disk.
    pub produced_artifacts: Vec<PathBuf>,
}

impl ExecutionResult {
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.stages.iter().map(|s| s.duration_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_result_serializes() {
        let result = ExecutionResult {
            exit_status: 0,
            stages: vec![StageRecord {
                name: "Align".to_string(),
                command: "bowtie2 -p 8".to_string(),
                exit_code: 0,
                duration_ms: 1500,
            }],
            produced_artifacts: vec![PathBuf::from("out/S1.bam")],
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"duration_ms\":1500"));
        assert_eq!(result.stage_names(), vec!["Align"]);
        assert_eq!(result.total_duration_ms(), 1500);
    }
}

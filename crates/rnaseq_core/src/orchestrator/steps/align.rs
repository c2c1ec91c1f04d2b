//! Align step - maps the sample's reads against the aligner index.

use std::path::PathBuf;

use crate::command::{ConfigurationResult, Invocation};
use crate::models::{ArtifactPaths, SampleSet};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::Context;

/// Produces `<out>/<b>.sam`, which is removed after the run.
pub struct AlignStep {
    sample: SampleSet,
    index_prefix: String,
    paths: ArtifactPaths,
}

impl AlignStep {
    pub fn new(sample: SampleSet, index_prefix: impl Into<String>, paths: ArtifactPaths) -> Self {
        Self {
            sample,
            index_prefix: index_prefix.into(),
            paths,
        }
    }
}

impl PipelineStep for AlignStep {
    fn name(&self) -> &str {
        "Align"
    }

    fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation> {
        Ok(ctx.builder().align(&self.sample, &self.index_prefix, &self.paths))
    }

    fn declared_inputs(&self) -> Vec<PathBuf> {
        self.sample.all_files().into_iter().cloned().collect()
    }

    fn declared_outputs(&self) -> Vec<PathBuf> {
        vec![self.paths.sam()]
    }

    fn transient_outputs(&self) -> Vec<PathBuf> {
        vec![self.paths.sam()]
    }

    fn description(&self) -> &str {
        "Align reads to the reference index"
    }
}

//! Format conversion steps around quantification.

use std::path::PathBuf;

use crate::command::{ConfigurationResult, Invocation};
use crate::models::ArtifactPaths;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::Context;

/// `<b>.sam` to sorted `<b>.bam`.
pub struct SortStep {
    paths: ArtifactPaths,
}

impl SortStep {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }
}

impl PipelineStep for SortStep {
    fn name(&self) -> &str {
        "ConvertToIndexedBinary"
    }

    fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation> {
        Ok(ctx.builder().sort(&self.paths))
    }

    fn declared_inputs(&self) -> Vec<PathBuf> {
        vec![self.paths.sam()]
    }

    fn declared_outputs(&self) -> Vec<PathBuf> {
        vec![self.paths.bam()]
    }

    fn description(&self) -> &str {
        "Sort the alignment into binary form"
    }
}

/// `<b>.bam` to `<b>.gff`.
pub struct AnnotateStep {
    paths: ArtifactPaths,
}

impl AnnotateStep {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }
}

impl PipelineStep for AnnotateStep {
    fn name(&self) -> &str {
        "ConvertToAnnotationFormat"
    }

    fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation> {
        Ok(ctx.builder().annotate(&self.paths))
    }

    fn declared_inputs(&self) -> Vec<PathBuf> {
        vec![self.paths.bam()]
    }

    fn declared_outputs(&self) -> Vec<PathBuf> {
        vec![self.paths.gff()]
    }
}

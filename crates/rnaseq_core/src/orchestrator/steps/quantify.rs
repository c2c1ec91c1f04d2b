//! Quantify step - transcript assembly against the annotation index.

use std::path::PathBuf;

use super::reference::ReferenceIndex;
use crate::command::{ConfigurationResult, Invocation};
use crate::models::ArtifactPaths;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::Context;

/// Writes the quantification tables to `<out>/<b>/`.
pub struct QuantifyStep {
    reference: ReferenceIndex,
    paths: ArtifactPaths,
}

impl QuantifyStep {
    pub fn new(reference: ReferenceIndex, paths: ArtifactPaths) -> Self {
        Self { reference, paths }
    }
}

impl PipelineStep for QuantifyStep {
    fn name(&self) -> &str {
        "Quantify"
    }

    fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation> {
        let annotation = self.reference.annotation_path()?;
        Ok(ctx.builder().quantify(&annotation, &self.paths))
    }

    fn declared_inputs(&self) -> Vec<PathBuf> {
        let mut inputs = vec![self.paths.bam()];
        // An unsupported index type is reported by build_command
        if let Ok(annotation) = self.reference.annotation_path() {
            inputs.push(PathBuf::from(annotation));
        }
        inputs
    }

    fn declared_outputs(&self) -> Vec<PathBuf> {
        vec![self.paths.quant_dir()]
    }

    fn description(&self) -> &str {
        "Assemble and quantify transcripts"
    }
}

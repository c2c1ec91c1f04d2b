//! Assembled pipelines for each analysis.

use std::path::PathBuf;

use super::errors::{PipelineError, PipelineResult};
use super::pipeline::Pipeline;
use super::steps::{
    AlignStep, AnnotateStep, DiffExpressionStep, NormalizeStep, QuantifyStep, ReferenceIndex,
    SortStep,
};
use super::types::{Context, ExecutionResult};
use crate::models::{ArtifactPaths, ReplicateGroup, SampleSet};
use crate::samples::resolve_sample;

/// Align → ConvertToIndexedBinary → Quantify → ConvertToAnnotationFormat.
///
/// Locks `<out>/.<basename>.lock` for the run.
pub fn alignment_pipeline(
    sample: &SampleSet,
    reference: &ReferenceIndex,
    paths: &ArtifactPaths,
) -> Pipeline {
    Pipeline::new()
        .with_step(AlignStep::new(
            sample.clone(),
            reference.aligner_prefix(),
            paths.clone(),
        ))
        .with_step(SortStep::new(paths.clone()))
        .with_step(QuantifyStep::new(reference.clone(), paths.clone()))
        .with_step(AnnotateStep::new(paths.clone()))
        .with_lock(paths.lock_file())
}

/// One sample, from read directory to final artifacts.
#[derive(Debug, Clone)]
pub struct AlignmentRequest {
    pub basename: String,
    pub input_dir: PathBuf,
    pub reference: ReferenceIndex,
    pub output_dir: PathBuf,
}

impl AlignmentRequest {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.output_dir, &self.basename)
    }
}

/// Resolve the sample's read files, then run the alignment pipeline.
///
/// Resolution failures return before any command is built.
pub fn run_alignment(ctx: &Context, request: &AlignmentRequest) -> PipelineResult<ExecutionResult> {
    ctx.logger.section(&format!("Sample {}", request.basename));

    let sample = resolve_sample(&ctx.settings.samples, &request.input_dir, &request.basename)
        .map_err(|e| PipelineError::resolution(&ctx.job_name, e))?;
    ctx.logger.info(&format!(
        "Resolved {} replicate(s) ({})",
        sample.replicate_count(),
        sample.mode
    ));

    alignment_pipeline(&sample, &request.reference, &request.paths()).run(ctx)
}

/// Two-condition comparison.
#[derive(Debug, Clone)]
pub struct DiffExpressionRequest {
    pub group_a: ReplicateGroup,
    pub group_b: ReplicateGroup,
    pub reference: ReferenceIndex,
    pub output_dir: PathBuf,
}

/// Single-stage differential expression pipeline.
pub fn diff_expression_pipeline(request: &DiffExpressionRequest) -> Pipeline {
    Pipeline::new()
        .with_step(DiffExpressionStep::new(
            request.group_a.clone(),
            request.group_b.clone(),
            request.reference.clone(),
            &request.output_dir,
        ))
        .with_lock(request.output_dir.join(".diff.lock"))
}

/// N-condition normalization.
#[derive(Debug, Clone)]
pub struct NormalizationRequest {
    pub groups: Vec<ReplicateGroup>,
    pub reference: ReferenceIndex,
    pub output_dir: PathBuf,
}

/// Single-stage normalization pipeline.
pub fn normalization_pipeline(request: &NormalizationRequest) -> Pipeline {
    Pipeline::new()
        .with_step(NormalizeStep::new(
            request.groups.clone(),
            request.reference.clone(),
            &request.output_dir,
        ))
        .with_lock(request.output_dir.join(".norm.lock"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn alignment_stage_order() {
        let sample = SampleSet::paired(
            "S1",
            vec![PathBuf::from("S1_R1.fastq")],
            vec![PathBuf::from("S1_R2.fastq")],
        );
        let reference = ReferenceIndex::new("/idx/", "ecoli", ".gtf");
        let pipeline = alignment_pipeline(&sample, &reference, &ArtifactPaths::new("out", "S1"));

        assert_eq!(
            pipeline.step_names(),
            vec!["Align", "ConvertToIndexedBinary", "Quantify", "ConvertToAnnotationFormat"]
        );
    }

    #[test]
    fn comparison_pipelines_have_one_stage() {
        let reference = ReferenceIndex::new("/idx/", "ecoli", ".gtf");
        let diff = diff_expression_pipeline(&DiffExpressionRequest {
            group_a: ReplicateGroup::new("wt", vec![PathBuf::from("wt.bam")]),
            group_b: ReplicateGroup::new("mt", vec![PathBuf::from("mt.bam")]),
            reference: reference.clone(),
            output_dir: Path::new("out").to_path_buf(),
        });
        assert_eq!(diff.step_names(), vec!["DiffExpression"]);

        let norm = normalization_pipeline(&NormalizationRequest {
            groups: vec![],
            reference,
            output_dir: PathBuf::from("norm"),
        });
        assert_eq!(norm.step_names(), vec!["Normalize"]);
    }
}

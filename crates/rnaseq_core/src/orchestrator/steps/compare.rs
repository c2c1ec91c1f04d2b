//! Cross-sample steps: differential expression and normalization.

use std::path::PathBuf;

use super::reference::ReferenceIndex;
use crate::command::{ConfigurationResult, Invocation};
use crate::models::ReplicateGroup;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::Context;
use crate::results::DEFAULT_TABLE;

/// Gene-level table written by the normalizer in its default format.
pub const NORMALIZED_TABLE: &str = "genes.fpkm_table";

fn inputs(groups: &[&ReplicateGroup], reference: &ReferenceIndex) -> Vec<PathBuf> {
    let mut inputs: Vec<PathBuf> = groups
        .iter()
        .flat_map(|g| g.replicates.iter().cloned())
        .collect();
    if let Ok(path) = reference.annotation_path() {
        inputs.push(PathBuf::from(path));
    }
    inputs
}

/// Two-condition differential expression into one output directory.
pub struct DiffExpressionStep {
    group_a: ReplicateGroup,
    group_b: ReplicateGroup,
    reference: ReferenceIndex,
    output_dir: PathBuf,
}

impl DiffExpressionStep {
    pub fn new(
        group_a: ReplicateGroup,
        group_b: ReplicateGroup,
        reference: ReferenceIndex,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            group_a,
            group_b,
            reference,
            output_dir: output_dir.into(),
        }
    }
}

impl PipelineStep for DiffExpressionStep {
    fn name(&self) -> &str {
        "DiffExpression"
    }

    fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation> {
        let annotation = self.reference.annotation_path()?;
        ctx.builder()
            .diff_expression(&self.group_a, &self.group_b, &annotation, &self.output_dir)
    }

    fn declared_inputs(&self) -> Vec<PathBuf> {
        inputs(&[&self.group_a, &self.group_b], &self.reference)
    }

    /// The output directory already exists once the lock is held, so the
    /// check is on the table inside it.
    fn declared_outputs(&self) -> Vec<PathBuf> {
        vec![self.output_dir.join(DEFAULT_TABLE)]
    }

    fn description(&self) -> &str {
        "Test for differential expression between two conditions"
    }
}

/// Normalized expression tables for N conditions.
pub struct NormalizeStep {
    groups: Vec<ReplicateGroup>,
    reference: ReferenceIndex,
    output_dir: PathBuf,
}

impl NormalizeStep {
    pub fn new(
        groups: Vec<ReplicateGroup>,
        reference: ReferenceIndex,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            groups,
            reference,
            output_dir: output_dir.into(),
        }
    }
}

impl PipelineStep for NormalizeStep {
    fn name(&self) -> &str {
        "Normalize"
    }

    fn build_command(&self, ctx: &Context) -> ConfigurationResult<Invocation> {
        let annotation = self.reference.annotation_path()?;
        ctx.builder()
            .normalize(&self.groups, &annotation, &self.output_dir)
    }

    fn declared_inputs(&self) -> Vec<PathBuf> {
        let groups: Vec<&ReplicateGroup> = self.groups.iter().collect();
        inputs(&groups, &self.reference)
    }

    fn declared_outputs(&self) -> Vec<PathBuf> {
        vec![self.output_dir.join(NORMALIZED_TABLE)]
    }
}

//! Pipeline orchestrator for sequencing external tools.
//!
//! A run is a fixed sequence of stages. Each stage builds one external
//! command, and hands its output files to the next stage on disk.
//!
//! # Architecture
//!
//! ```text
//! Pipeline (alignment)
//!     ├── Stage: Align                      reads  → <b>.sam
//!     ├── Stage: ConvertToIndexedBinary     <b>.sam → <b>.bam
//!     ├── Stage: Quantify                   <b>.bam → <b>/
//!     └── Stage: ConvertToAnnotationFormat  <b>.bam → <b>.gff
//!
//! Pipeline (comparison)
//!     └── Stage: DiffExpression | Normalize
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rnaseq_core::orchestrator::{run_alignment, AlignmentRequest, Context, ReferenceIndex};
//!
//! let ctx = Context::new(settings, "S1", logger, Arc::new(SystemRunner::new()));
//! let request = AlignmentRequest {
//!     basename: "S1".into(),
//!     input_dir: "/data/fastq".into(),
//!     reference: ReferenceIndex::new("/data/indexes/", "ecoli", ".gtf"),
//!     output_dir: "/data/output".into(),
//! };
//! let result = run_alignment(&ctx, &request)?;
//! println!("Stages: {:?}", result.stage_names());
//! ```

mod errors;
mod lock;
mod pipeline;
mod step;
pub mod steps;
mod types;
mod workflows;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use lock::OutputLock;
pub use pipeline::{CancelHandle, Pipeline};
pub use step::PipelineStep;
pub use steps::{
    AlignStep, AnnotateStep, DiffExpressionStep, NormalizeStep, QuantifyStep, ReferenceIndex,
    SortStep, NORMALIZED_TABLE,
};
pub use types::{Context, ExecutionResult, StageRecord};
pub use workflows::{
    alignment_pipeline, diff_expression_pipeline, normalization_pipeline, run_alignment,
    AlignmentRequest, DiffExpressionRequest, NormalizationRequest,
};

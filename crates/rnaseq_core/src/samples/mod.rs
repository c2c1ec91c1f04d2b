//! Sample read file discovery.
//!
//! Turns a directory of read files plus a basename into a validated,
//! deterministically ordered [`SampleSet`](crate::models::SampleSet).
//!
//! # Usage
//!
//! ```ignore
//! use rnaseq_core::samples::resolve_sample;
//!
//! let sample = resolve_sample(&settings.samples, Path::new("/data/fastq"), "S1")?;
//! assert_eq!(sample.mate1_files.len(), sample.mate2_files.len());
//! ```

mod errors;
mod resolver;

pub use errors::{ResolutionError, ResolutionResult};
pub use resolver::{file_names, resolve_sample, MateToken, SampleFileResolver};

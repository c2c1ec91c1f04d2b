//! Stage command construction.
//!
//! Turns a resolved sample, the pipeline options and the tool table into
//! explicit [`Invocation`]s. Nothing in this module spawns a process.

mod builder;
mod errors;
mod invocation;

pub use builder::{aligner_index, annotation_index, replicate_groups, CommandBuilder};
pub use errors::{ConfigurationError, ConfigurationResult};
pub use invocation::Invocation;

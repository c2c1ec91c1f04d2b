//! Data models for the RNA-seq pipeline.
//!
//! This module contains the core data structures shared across components:
//! - Enums for library types, normalization methods, index types, read modes
//! - Sample structures (resolved read files, replicate groups)
//! - The on-disk artifact layout produced for one sample

mod artifacts;
mod enums;
mod sample;

pub use artifacts::ArtifactPaths;
pub use enums::{IndexType, LibraryNormMethod, LibraryType, MountMode, ReadMode, UnclassifiedPolicy};
pub use sample::{ReplicateGroup, SampleSet};

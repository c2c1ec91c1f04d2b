//! Sample structures (resolved read files and replicate groups).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::ReadMode;

/// Read files of one biological replicate group.
///
/// Built once by the resolver and never modified afterwards. In paired
/// mode `mate1_files[i]` and `mate2_files[i]` form one replicate; the
/// correspondence is positional after sorting by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSet {
    /// Prefix shared by every file of the sample.
    pub basename: String,
    /// Read layout.
    pub mode: ReadMode,
    /// Mate 1 files, sorted ascending (paired mode only).
    #[serde(default)]
    pub mate1_files: Vec<PathBuf>,
    /// Mate 2 files, sorted ascending (paired mode only).
    #[serde(default)]
    pub mate2_files: Vec<PathBuf>,
    /// Flat file list, sorted ascending (unpaired mode only).
    #[serde(default)]
    pub unpaired_files: Vec<PathBuf>,
}

impl SampleSet {
    /// Create a paired sample. Both lists are sorted here.
    pub fn paired(
        basename: impl Into<String>,
        mut mate1_files: Vec<PathBuf>,
        mut mate2_files: Vec<PathBuf>,
    ) -> Self {
        mate1_files.sort();
        mate2_files.sort();
        Self {
            basename: basename.into(),
            mode: ReadMode::Paired,
            mate1_files,
            mate2_files,
            unpaired_files: Vec::new(),
        }
    }

    /// Create an unpaired sample. The list is sorted here.
    pub fn unpaired(basename: impl Into<String>, mut files: Vec<PathBuf>) -> Self {
        files.sort();
        Self {
            basename: basename.into(),
            mode: ReadMode::Unpaired,
            mate1_files: Vec::new(),
            mate2_files: Vec::new(),
            unpaired_files: files,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.mode == ReadMode::Paired
    }

    /// Number of replicates (file pairs, or files in unpaired mode).
    pub fn replicate_count(&self) -> usize {
        match self.mode {
            ReadMode::Paired => self.mate1_files.len(),
            ReadMode::Unpaired => self.unpaired_files.len(),
        }
    }

    /// Every read file of the sample.
    pub fn all_files(&self) -> Vec<&PathBuf> {
        self.mate1_files
            .iter()
            .chain(self.mate2_files.iter())
            .chain(self.unpaired_files.iter())
            .collect()
    }
}

/// Alignment files for one condition of a differential comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateGroup {
    /// Condition label (passed to `-L`).
    pub name: String,
    /// One alignment file per replicate.
    pub replicates: Vec<PathBuf>,
}

impl ReplicateGroup {
    pub fn new(name: impl Into<String>, replicates: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            replicates,
        }
    }
}

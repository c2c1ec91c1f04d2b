//! On-disk layout of one sample's pipeline artifacts.

use std::path::{Path, PathBuf};

/// Deterministic artifact paths for `(output_dir, basename)`.
///
/// Every path is a pure function of the two inputs, so reruns overwrite
/// the previous intermediates in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    output_dir: PathBuf,
    basename: String,
}

impl ArtifactPaths {
    pub fn new(output_dir: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            basename: basename.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Raw aligner output (`<out>/<basename>.sam`), transient.
    pub fn sam(&self) -> PathBuf {
        self.output_dir.join(format!("{}.sam", self.basename))
    }

    /// Sorted binary alignment (`<out>/<basename>.bam`).
    pub fn bam(&self) -> PathBuf {
        self.output_dir.join(format!("{}.bam", self.basename))
    }

    /// Quantification directory (`<out>/<basename>/`).
    pub fn quant_dir(&self) -> PathBuf {
        self.output_dir.join(&self.basename)
    }

    /// Annotation conversion output (`<out>/<basename>.gff`).
    pub fn gff(&self) -> PathBuf {
        self.output_dir.join(format!("{}.gff", self.basename))
    }

    /// Advisory lock held while a run owns this layout.
    pub fn lock_file(&self) -> PathBuf {
        self.output_dir.join(format!(".{}.lock", self.basename))
    }

    /// Names of the final artifacts, relative to the output directory.
    pub fn final_artifact_names(&self) -> Vec<String> {
        vec![
            format!("{}.bam", self.basename),
            format!("{}.gff", self.basename),
            self.basename.clone(),
        ]
    }
}

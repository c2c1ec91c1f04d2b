//! Reference index locations shared by the steps.

use crate::command::{aligner_index, annotation_index, ConfigurationResult};

/// Indexes of one organism under an index directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIndex {
    /// Joined with `organism` by plain concatenation.
    pub indexes_dir: String,
    pub organism: String,
    /// Annotation extension, checked when a command is built.
    pub index_type: String,
}

impl ReferenceIndex {
    pub fn new(
        indexes_dir: impl Into<String>,
        organism: impl Into<String>,
        index_type: impl Into<String>,
    ) -> Self {
        Self {
            indexes_dir: indexes_dir.into(),
            organism: organism.into(),
            index_type: index_type.into(),
        }
    }

    pub fn aligner_prefix(&self) -> String {
        aligner_index(&self.indexes_dir, &self.organism)
    }

    pub fn annotation_path(&self) -> ConfigurationResult<String> {
        annotation_index(&self.indexes_dir, &self.organism, &self.index_type)
    }
}

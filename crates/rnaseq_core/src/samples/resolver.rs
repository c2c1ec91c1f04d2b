//! Read file discovery and mate pairing.
//!
//! A file belongs to a sample when its name starts with the basename and
//! ends with the read suffix. In paired mode the remainder of the name is
//! reduced to a mate token:
//!
//! ```text
//! S1_L001_R1_001.fastq
//!   strip basename + suffix  ->  _L001_R1_001
//!   strip segment marker     ->  _L001_R1
//!   trim separators          ->  L001_R1
//!   lane tokens + mate       ->  [L001] R1
//! ```
//!
//! Pairing is positional: both mate lists are sorted by full path and
//! replicate `i` is `(mate1[i], mate2[i])`. File contents are never read.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{ResolutionError, ResolutionResult};
use crate::config::SampleSettings;
use crate::models::{ReadMode, SampleSet, UnclassifiedPolicy};

const SEPARATOR: char = '_';

/// Mate assignment of one read file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MateToken {
    Mate1,
    Mate2,
    /// Neither marker; carries the cleaned token for diagnostics.
    Unclassified(String),
}

/// Builds a `SampleSet` from a directory listing.
pub struct SampleFileResolver<'a> {
    settings: &'a SampleSettings,
}

impl<'a> SampleFileResolver<'a> {
    pub fn new(settings: &'a SampleSettings) -> Self {
        Self { settings }
    }

    /// Resolve the read files of `basename` in `input_dir`.
    pub fn resolve(&self, input_dir: &Path, basename: &str) -> ResolutionResult<SampleSet> {
        let names = self.qualifying_names(input_dir, basename)?;
        tracing::debug!(
            "{} file(s) in {} qualify for sample '{}'",
            names.len(),
            input_dir.display(),
            basename
        );

        match self.settings.mode {
            ReadMode::Paired => self.resolve_paired(input_dir, basename, &names),
            ReadMode::Unpaired => {
                if names.is_empty() {
                    return Err(ResolutionError::empty_sample(basename, input_dir));
                }
                let files = names.iter().map(|n| input_dir.join(n)).collect();
                Ok(SampleSet::unpaired(basename, files))
            }
        }
    }

    fn resolve_paired(
        &self,
        input_dir: &Path,
        basename: &str,
        names: &[String],
    ) -> ResolutionResult<SampleSet> {
        let mut mate1 = Vec::new();
        let mut mate2 = Vec::new();

        for name in names {
            let path = input_dir.join(name);
            match self.classify(basename, name) {
                MateToken::Mate1 => mate1.push(path),
                MateToken::Mate2 => mate2.push(path),
                MateToken::Unclassified(token) => match self.settings.unclassified {
                    UnclassifiedPolicy::Skip => {
                        tracing::warn!(
                            "Skipping {}: '{}' is neither R1 nor R2",
                            path.display(),
                            token
                        );
                    }
                    UnclassifiedPolicy::Error => {
                        return Err(ResolutionError::unrecognized_mate_token(path, token));
                    }
                },
            }
        }

        if mate1.is_empty() {
            return Err(ResolutionError::empty_sample(basename, input_dir));
        }
        if mate1.len() != mate2.len() {
            return Err(ResolutionError::mate_pair_count_mismatch(
                basename,
                mate1.len(),
                mate2.len(),
            ));
        }

        Ok(SampleSet::paired(basename, mate1, mate2))
    }

    /// Names in `input_dir` that start with `basename` and end with the suffix.
    fn qualifying_names(&self, input_dir: &Path, basename: &str) -> ResolutionResult<Vec<String>> {
        let entries = fs::read_dir(input_dir).map_err(|e| ResolutionError::io(input_dir, e))?;
        let suffix = self.settings.read_suffix.as_str();

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ResolutionError::io(input_dir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.len() >= basename.len() + suffix.len()
                && name.starts_with(basename)
                && name.ends_with(suffix)
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Reduce a qualifying file name to its mate token.
    pub fn classify(&self, basename: &str, file_name: &str) -> MateToken {
        let suffix = self.settings.read_suffix.as_str();
        let mut part = &file_name[basename.len()..file_name.len() - suffix.len()];

        if let Some(marker) = self
            .settings
            .lane_markers
            .iter()
            .find(|m| !m.is_empty() && part.ends_with(m.as_str()))
        {
            part = &part[..part.len() - marker.len()];
        }

        let cleaned = part.trim_matches(SEPARATOR);
        let mut components: Vec<&str> = cleaned.split(SEPARATOR).collect();
        let token = components.pop().unwrap_or_default();

        if !components.iter().all(|c| is_lane_token(c)) {
            return MateToken::Unclassified(cleaned.to_string());
        }

        match token {
            "R1" => MateToken::Mate1,
            "R2" => MateToken::Mate2,
            _ => MateToken::Unclassified(cleaned.to_string()),
        }
    }
}

/// `L` followed by one or more digits (e.g. `L001`).
fn is_lane_token(component: &str) -> bool {
    let mut chars = component.chars();
    chars.next() == Some('L') && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
    }
}

/// Resolve with the given settings. Convenience over [`SampleFileResolver`].
pub fn resolve_sample(
    settings: &SampleSettings,
    input_dir: &Path,
    basename: &str,
) -> ResolutionResult<SampleSet> {
    SampleFileResolver::new(settings).resolve(input_dir, basename)
}

/// Paths as they appear in a resolved sample, for display.
pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .collect()
}

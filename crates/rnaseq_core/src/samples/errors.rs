//! Read file resolution errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to build a `SampleSet` from a directory listing.
///
/// Raised before any command is built or process spawned.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// No qualifying read files for the basename.
    #[error("No read files for sample '{basename}' in {}", dir.display())]
    EmptySample { basename: String, dir: PathBuf },

    /// Mate 1 and mate 2 lists have different lengths.
    #[error("Sample '{basename}' has {mate1} mate 1 file(s) but {mate2} mate 2 file(s)")]
    MatePairCountMismatch {
        basename: String,
        mate1: usize,
        mate2: usize,
    },

    /// A qualifying file matched neither mate marker.
    #[error("Cannot classify {} as mate 1 or mate 2 (token '{token}')", file.display())]
    UnrecognizedMateToken { file: PathBuf, token: String },

    /// The input directory could not be listed.
    #[error("Cannot list {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolutionError {
    pub fn empty_sample(basename: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::EmptySample {
            basename: basename.into(),
            dir: dir.into(),
        }
    }

    pub fn mate_pair_count_mismatch(basename: impl Into<String>, mate1: usize, mate2: usize) -> Self {
        Self::MatePairCountMismatch {
            basename: basename.into(),
            mate1,
            mate2,
        }
    }

    pub fn unrecognized_mate_token(file: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self::UnrecognizedMateToken {
            file: file.into(),
            token: token.into(),
        }
    }

    pub fn io(dir: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            dir: dir.into(),
            source,
        }
    }
}

/// Result type for resolution.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

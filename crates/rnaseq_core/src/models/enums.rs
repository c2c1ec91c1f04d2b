//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Strandedness encoding passed to the quantifier and differential tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryType {
    FrUnstranded,
    #[default]
    FrFirststrand,
    FrSecondstrand,
    FfUnstranded,
    FfFirststrand,
    FfSecondstrand,
    Transfrags,
}

impl LibraryType {
    /// Flag value as the tools expect it on the command line.
    pub fn as_flag(&self) -> &'static str {
        match self {
            LibraryType::FrUnstranded => "fr-unstranded",
            LibraryType::FrFirststrand => "fr-firststrand",
            LibraryType::FrSecondstrand => "fr-secondstrand",
            LibraryType::FfUnstranded => "ff-unstranded",
            LibraryType::FfFirststrand => "ff-firststrand",
            LibraryType::FfSecondstrand => "ff-secondstrand",
            LibraryType::Transfrags => "transfrags",
        }
    }
}

impl std::fmt::Display for LibraryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Library normalization method for differential expression and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryNormMethod {
    ClassicFpkm,
    Geometric,
    /// Upper-quartile normalization.
    #[default]
    Quartile,
}

impl LibraryNormMethod {
    pub fn as_flag(&self) -> &'static str {
        match self {
            LibraryNormMethod::ClassicFpkm => "classic-fpkm",
            LibraryNormMethod::Geometric => "geometric",
            LibraryNormMethod::Quartile => "quartile",
        }
    }
}

impl std::fmt::Display for LibraryNormMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Annotation index file type.
///
/// Configured as a raw extension string and parsed when commands are
/// built, so an unknown extension surfaces as a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Gtf,
    Gff,
}

impl IndexType {
    /// Parse a file extension (with leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".gtf" => Some(IndexType::Gtf),
            ".gff" => Some(IndexType::Gff),
            _ => None,
        }
    }

    /// Extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            IndexType::Gtf => ".gtf",
            IndexType::Gff => ".gff",
        }
    }
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Sequencing read layout of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    #[default]
    Paired,
    Unpaired,
}

impl std::fmt::Display for ReadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadMode::Paired => write!(f, "paired"),
            ReadMode::Unpaired => write!(f, "unpaired"),
        }
    }
}

/// What to do with read files whose name matches neither mate marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnclassifiedPolicy {
    /// Drop the file from both mate lists and log a warning.
    #[default]
    Skip,
    /// Fail resolution with `UnrecognizedMateToken`.
    Error,
}

/// Access mode of a container mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

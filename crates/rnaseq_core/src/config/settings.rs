//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::{ConfigurationError, ConfigurationResult};
use crate::models::{LibraryNormMethod, LibraryType, ReadMode, UnclassifiedPolicy};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Index, output, staging and log locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// Executables for each external tool.
    #[serde(default)]
    pub tools: ToolPaths,

    /// Options interpolated into the stage commands.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Read file discovery.
    #[serde(default)]
    pub samples: SampleSettings,

    /// Deadlines and intermediate handling.
    #[serde(default)]
    pub execution: ExecutionSettings,

    /// Container mode.
    #[serde(default)]
    pub container: ContainerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding the aligner and annotation indexes.
    ///
    /// Concatenated with the organism name as-is, so keep the trailing
    /// separator.
    #[serde(default = "default_indexes_dir")]
    pub indexes_dir: String,

    /// Default output folder.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for host-side staging of container artifacts.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for per-run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_indexes_dir() -> String {
    "../indexes/".to_string()
}

fn default_output_folder() -> String {
    "rnaseq_output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            indexes_dir: default_indexes_dir(),
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Executable (name on PATH or absolute path) for each logical tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_aligner")]
    pub aligner: String,

    /// SAM to sorted BAM converter.
    #[serde(default = "default_samtools")]
    pub samtools: String,

    /// Transcript assembler / quantifier.
    #[serde(default = "default_quantifier")]
    pub quantifier: String,

    /// BAM to GFF converter.
    #[serde(default = "default_annotation_converter")]
    pub annotation_converter: String,

    #[serde(default = "default_diff_expression")]
    pub diff_expression: String,

    #[serde(default = "default_normalizer")]
    pub normalizer: String,
}

fn default_aligner() -> String {
    "bowtie2".to_string()
}

fn default_samtools() -> String {
    "samtools".to_string()
}

fn default_quantifier() -> String {
    "cufflinks".to_string()
}

fn default_annotation_converter() -> String {
    "bam2gff".to_string()
}

fn default_diff_expression() -> String {
    "cuffdiff".to_string()
}

fn default_normalizer() -> String {
    "cuffnorm".to_string()
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            aligner: default_aligner(),
            samtools: default_samtools(),
            quantifier: default_quantifier(),
            annotation_converter: default_annotation_converter(),
            diff_expression: default_diff_expression(),
            normalizer: default_normalizer(),
        }
    }
}

/// Options interpolated verbatim into stage commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Parallelism hint passed to every tool.
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Bases trimmed from the 3' end of each read.
    #[serde(default = "default_trim3")]
    pub trim3: u32,

    /// Maximum paired fragment length.
    #[serde(default = "default_insert_size")]
    pub insert_size: u32,

    #[serde(default)]
    pub library_type: LibraryType,

    #[serde(default)]
    pub library_norm_method: LibraryNormMethod,

    /// False discovery rate threshold, in (0, 1].
    #[serde(default = "default_fdr")]
    pub fdr: f64,

    /// Annotation index extension (`.gtf` or `.gff`).
    #[serde(default = "default_index_type")]
    pub index_type: String,

    /// Raw options appended after the built-in flags.
    #[serde(default)]
    pub extra_options: Option<String>,
}

fn default_threads() -> u32 {
    8
}

fn default_trim3() -> u32 {
    3
}

fn default_insert_size() -> u32 {
    1000
}

fn default_fdr() -> f64 {
    0.05
}

fn default_index_type() -> String {
    ".gtf".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            trim3: default_trim3(),
            insert_size: default_insert_size(),
            library_type: LibraryType::default(),
            library_norm_method: LibraryNormMethod::default(),
            fdr: default_fdr(),
            index_type: default_index_type(),
            extra_options: None,
        }
    }
}

impl PipelineConfig {
    /// Check numeric ranges.
    ///
    /// The index type is checked by the command builder, not here.
    pub fn validate(&self) -> ConfigurationResult<()> {
        if self.threads == 0 {
            return Err(ConfigurationError::invalid_value("threads", "must be greater than 0"));
        }
        if self.insert_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "insert_size",
                "must be greater than 0",
            ));
        }
        if !(self.fdr > 0.0 && self.fdr <= 1.0) {
            return Err(ConfigurationError::invalid_value(
                "fdr",
                format!("{} is outside (0, 1]", self.fdr),
            ));
        }
        Ok(())
    }

    /// Whitespace-separated tokens of `extra_options`.
    pub fn extra_tokens(&self) -> Vec<String> {
        self.extra_options
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Read file discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSettings {
    /// Suffix a read file must end with.
    #[serde(default = "default_read_suffix")]
    pub read_suffix: String,

    #[serde(default)]
    pub mode: ReadMode,

    /// Handling of files that are neither R1 nor R2.
    #[serde(default)]
    pub unclassified: UnclassifiedPolicy,

    /// Lane/segment markers stripped before mate classification.
    #[serde(default = "default_lane_markers")]
    pub lane_markers: Vec<String>,
}

fn default_read_suffix() -> String {
    ".fastq".to_string()
}

fn default_lane_markers() -> Vec<String> {
    vec!["_001".to_string(), "_000".to_string(), "_002".to_string()]
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            read_suffix: default_read_suffix(),
            mode: ReadMode::default(),
            unclassified: UnclassifiedPolicy::default(),
            lane_markers: default_lane_markers(),
        }
    }
}

/// Stage deadlines and intermediate handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Deadline applied to every stage, in seconds. Unset means no deadline.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,

    /// Per-stage deadlines keyed by stage name, overriding the default.
    #[serde(default)]
    pub stage_timeouts: BTreeMap<String, u64>,

    /// Keep the raw alignment output after the run.
    #[serde(default)]
    pub keep_intermediates: bool,

    /// How often a running process is polled for exit and cancellation.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            stage_timeout_secs: None,
            stage_timeouts: BTreeMap::new(),
            keep_intermediates: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ExecutionSettings {
    /// Deadline for the named stage.
    pub fn timeout_for(&self, stage_name: &str) -> Option<Duration> {
        self.stage_timeouts
            .get(stage_name)
            .copied()
            .or(self.stage_timeout_secs)
            .map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Container mode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Container runtime executable.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Prefix every runtime call with `sudo`.
    #[serde(default)]
    pub use_sudo: bool,

    /// Image that carries the tools and this pipeline.
    #[serde(default = "default_image")]
    pub image: String,

    /// Container path the host reads directory is bound to.
    #[serde(default = "default_reads_mount")]
    pub reads_mount: String,

    /// Container path the host indexes directory is bound to.
    #[serde(default = "default_indexes_mount")]
    pub indexes_mount: String,

    /// Output directory inside the container.
    #[serde(default = "default_container_output")]
    pub output_path: String,

    /// Pipeline executable inside the image.
    #[serde(default = "default_inner_program")]
    pub inner_program: String,

    /// Deadline for each runtime call, in seconds.
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,
}

fn default_runtime() -> String {
    "docker".to_string()
}

fn default_image() -> String {
    "dmccloskey/sequencing_utilities".to_string()
}

fn default_reads_mount() -> String {
    "/media/Resequencing_RNA/fastq/".to_string()
}

fn default_indexes_mount() -> String {
    "/media/Resequencing_RNA/indexes/".to_string()
}

fn default_container_output() -> String {
    "/home/user/Resequencing_RNA/output/".to_string()
}

fn default_inner_program() -> String {
    "rnaseq-pipeline".to_string()
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            use_sudo: false,
            image: default_image(),
            reads_mount: default_reads_mount(),
            indexes_mount: default_indexes_mount(),
            output_path: default_container_output(),
            inner_program: default_inner_program(),
            step_timeout_secs: None,
        }
    }
}

impl ContainerSettings {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Keep tool output in the tail buffer only instead of echoing it.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines shown when a stage fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix log lines with the wall-clock time.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Tools,
    Pipeline,
    Samples,
    Execution,
    Container,
    Logging,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 7] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Pipeline,
        ConfigSection::Samples,
        ConfigSection::Execution,
        ConfigSection::Container,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Pipeline => "pipeline",
            ConfigSection::Samples => "samples",
            ConfigSection::Execution => "execution",
            ConfigSection::Container => "container",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the table in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Index, output, staging and log directories",
            ConfigSection::Tools => "# External tool executables",
            ConfigSection::Pipeline => "# Options passed to the stage commands",
            ConfigSection::Samples => "# Read file discovery and mate pairing",
            ConfigSection::Execution => "# Stage deadlines and intermediate cleanup",
            ConfigSection::Container => "# Container mode",
            ConfigSection::Logging => "# Logging configuration",
        }
    }
}

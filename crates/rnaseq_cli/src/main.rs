//! RNA-seq pipeline - command-line entry point
//!
//! Handles:
//! - Argument parsing
//! - Configuration loading
//! - Application-level logging initialization
//! - Mapping failures to the process exit status

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use rnaseq_core::container::ContainerError;
use rnaseq_core::orchestrator::PipelineError;

mod commands;

/// Default config path: .config/rnaseq.toml (relative to current working directory)
fn default_config_path() -> PathBuf {
    PathBuf::from(".config").join("rnaseq.toml")
}

#[derive(Parser, Debug)]
#[command(name = "rnaseq-pipeline", author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (created with defaults when missing).
    #[arg(long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Debug logging and pass-through of every tool output line.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Align one sample and quantify it: .bam, .gff and a quantification
    /// directory in the output directory.
    Align(AlignArgs),
    /// Run `align` inside a throwaway container and move the artifacts to
    /// the host output directory.
    AlignContainer(AlignContainerArgs),
    /// Differential expression between two replicate groups.
    Diff(DiffArgs),
    /// Run `diff` inside a throwaway container.
    DiffContainer(DiffContainerArgs),
    /// Normalized expression tables across replicate groups.
    Norm(NormArgs),
    /// Summarize a differential expression table as JSON.
    LoadDiff(LoadDiffArgs),
    /// Write the default settings file.
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug)]
struct AlignArgs {
    /// Prefix shared by the sample's read files.
    basename: String,
    /// Directory containing the read files.
    input_dir: PathBuf,
    /// Index name under the indexes directory.
    organism: String,
    /// Index directory, joined to the organism as-is (keep the trailing '/').
    indexes_dir: String,
    output_dir: PathBuf,
    #[arg(long)]
    threads: Option<u32>,
    /// Bases trimmed from the 3' end of each read.
    #[arg(long)]
    trim3: Option<u32>,
    /// Treat every read file as unpaired.
    #[arg(long)]
    single_end: bool,
}

#[derive(Args, Debug)]
struct AlignContainerArgs {
    basename: String,
    host_input_dir: PathBuf,
    organism: String,
    host_indexes_dir: PathBuf,
    /// Host staging directory for extracted artifacts.
    local_dir: PathBuf,
    host_output_dir: PathBuf,
    threads: u32,
    trim3: u32,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Replicate alignment of the first condition (repeatable).
    #[arg(long = "group-a", required = true)]
    group_a: Vec<PathBuf>,
    /// Replicate alignment of the second condition (repeatable).
    #[arg(long = "group-b", required = true)]
    group_b: Vec<PathBuf>,
    name_a: String,
    name_b: String,
    organism: String,
    output_dir: PathBuf,
    /// Overrides `[paths] indexes_dir`.
    #[arg(long)]
    indexes_dir: Option<String>,
    #[arg(long)]
    threads: Option<u32>,
}

#[derive(Args, Debug)]
struct DiffContainerArgs {
    #[arg(long = "group-a", required = true)]
    group_a: Vec<PathBuf>,
    #[arg(long = "group-b", required = true)]
    group_b: Vec<PathBuf>,
    name_a: String,
    name_b: String,
    organism: String,
    host_indexes_dir: PathBuf,
    local_dir: PathBuf,
    host_output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct NormArgs {
    /// Replicates per group: `a1,a2|b1,b2|...`.
    #[arg(long)]
    groups: String,
    /// Group names: `n1,n2,...`.
    #[arg(long)]
    names: String,
    organism: String,
    output_dir: PathBuf,
    #[arg(long)]
    indexes_dir: Option<String>,
    #[arg(long)]
    threads: Option<u32>,
}

#[derive(Args, Debug)]
struct LoadDiffArgs {
    /// Table file, or a directory containing isoform_exp.diff.
    path: PathBuf,
    /// Include every row, not just the summary.
    #[arg(long)]
    rows: bool,
}

#[derive(Args, Debug)]
struct InitConfigArgs {
    /// Overwrite an existing settings file.
    #[arg(long)]
    force: bool,
}

/// Exit status for a failed run: the failing tool's code when there is one.
fn exit_status(err: &anyhow::Error) -> u8 {
    let code = if let Some(e) = err.downcast_ref::<PipelineError>() {
        e.exit_status()
    } else if let Some(e) = err.downcast_ref::<ContainerError>() {
        e.exit_status()
    } else {
        1
    };
    u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

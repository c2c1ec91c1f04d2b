//! Whole-workflow runs against a fake toolchain that writes the files each
//! tool would produce.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;

use rnaseq_core::command::Invocation;
use rnaseq_core::config::Settings;
use rnaseq_core::container::{alignment_job, ContainerAlignment, ContainerRunner, LifecycleState};
use rnaseq_core::logging::{JobLogger, LogConfig};
use rnaseq_core::models::{ReadMode, ReplicateGroup};
use rnaseq_core::orchestrator::{
    diff_expression_pipeline, run_alignment, AlignmentRequest, Context, DiffExpressionRequest,
    PipelineError, ReferenceIndex, StepError,
};
use rnaseq_core::runner::{CommandRunner, ExitOutcome, OutputSink, RunOptions, RunResult};
use rnaseq_core::samples::ResolutionError;

/// Records every invocation and creates the output named after `-S`/`-o`
/// (a directory when it ends in `/` or already is one), or the last
/// argument otherwise.
#[derive(Default)]
struct FakeToolchain {
    calls: Mutex<Vec<Vec<String>>>,
    fail_program: Option<(String, i32)>,
    /// Exits 0 without writing anything.
    silent_program: Option<String>,
}

/// Table a tool writes into its output directory.
fn table_for(program: &str) -> &'static str {
    match program {
        "cuffdiff" => "isoform_exp.diff",
        "cuffnorm" => "genes.fpkm_table",
        _ => "genes.fpkm_tracking",
    }
}

impl FakeToolchain {
    fn failing(program: &str, code: i32) -> Self {
        Self {
            fail_program: Some((program.to_string(), code)),
            ..Self::default()
        }
    }

    fn programs(&self) -> Vec<String> {
        self.calls.lock().iter().map(|argv| argv[0].clone()).collect()
    }
}

impl CommandRunner for FakeToolchain {
    fn run(
        &self,
        invocation: &Invocation,
        _options: &RunOptions,
        sink: &dyn OutputSink,
    ) -> RunResult<ExitOutcome> {
        self.calls.lock().push(invocation.argv());
        sink.line(&format!("[{}] processing", invocation.program), true);

        if let Some((program, code)) = &self.fail_program {
            if program == &invocation.program {
                sink.line("fatal: simulated failure", true);
                return Ok(ExitOutcome::new(*code, Duration::ZERO));
            }
        }

        if self.silent_program.as_deref() == Some(invocation.program.as_str()) {
            return Ok(ExitOutcome::new(0, Duration::ZERO));
        }

        let args = &invocation.args;
        let target = args
            .iter()
            .position(|a| a == "-S" || a == "-o")
            .and_then(|i| args.get(i + 1))
            .or_else(|| args.last());
        if let Some(target) = target {
            if target.ends_with('/') || Path::new(target).is_dir() {
                fs::create_dir_all(target).unwrap();
                let table = Path::new(target).join(table_for(&invocation.program));
                fs::write(table, "test_id\tvalue\n").unwrap();
            } else {
                fs::write(target, "data").unwrap();
            }
        }
        Ok(ExitOutcome::new(0, Duration::from_millis(1)))
    }
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(ws.reads()).unwrap();
        fs::create_dir_all(ws.indexes()).unwrap();
        fs::write(ws.indexes().join("ecoli.gtf"), "annotation").unwrap();
        ws
    }

    fn reads(&self) -> PathBuf {
        self.dir.path().join("fastq")
    }

    fn indexes(&self) -> PathBuf {
        self.dir.path().join("indexes")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    fn touch_reads(&self, names: &[&str]) {
        for name in names {
            fs::write(self.reads().join(name), "@read\nACGT\n+\nIIII\n").unwrap();
        }
    }

    fn reference(&self) -> ReferenceIndex {
        ReferenceIndex::new(format!("{}/", self.indexes().display()), "ecoli", ".gtf")
    }

    fn logger(&self, name: &str) -> Arc<JobLogger> {
        Arc::new(
            JobLogger::new(name, self.dir.path().join("logs"), LogConfig::default(), None).unwrap(),
        )
    }

    fn context(&self, settings: Settings, runner: Arc<FakeToolchain>) -> Context {
        Context::new(settings, "S1", self.logger("S1"), runner)
    }

    fn alignment(&self) -> AlignmentRequest {
        AlignmentRequest {
            basename: "S1".to_string(),
            input_dir: self.reads(),
            reference: self.reference(),
            output_dir: self.output(),
        }
    }
}

#[test]
fn paired_sample_runs_all_stages_and_keeps_final_artifacts() {
    let ws = Workspace::new();
    ws.touch_reads(&["S1_R1.fastq", "S1_R2.fastq"]);
    let runner = Arc::new(FakeToolchain::default());
    let ctx = ws.context(Settings::default(), runner.clone());

    let result = run_alignment(&ctx, &ws.alignment()).unwrap();

    assert_eq!(runner.programs(), vec!["bowtie2", "samtools", "cufflinks", "bam2gff"]);
    assert_eq!(
        result.stage_names(),
        vec!["Align", "ConvertToIndexedBinary", "Quantify", "ConvertToAnnotationFormat"]
    );
    assert!(ws.output().join("S1.bam").exists());
    assert!(ws.output().join("S1.gff").exists());
    assert!(ws.output().join("S1").is_dir());
    assert!(!ws.output().join("S1.sam").exists());
    assert!(!ws.output().join(".S1.lock").exists());
    assert!(!result.produced_artifacts.contains(&ws.output().join("S1.sam")));

    let align = &runner.calls.lock()[0];
    let mate1 = align.iter().position(|a| a == "-1").unwrap();
    assert!(align[mate1 + 1].ends_with("S1_R1.fastq"));
    assert!(align[mate1 + 3].ends_with("S1_R2.fastq"));
}

#[test]
fn lanes_pair_positionally_regardless_of_listing_order() {
    let ws = Workspace::new();
    ws.touch_reads(&[
        "S1_L002_R2_001.fastq",
        "S1_L001_R1_001.fastq",
        "S1_L002_R1_001.fastq",
        "S1_L001_R2_001.fastq",
        "S10_L001_R1_001.fastq",
    ]);
    let runner = Arc::new(FakeToolchain::default());
    let ctx = ws.context(Settings::default(), runner.clone());

    run_alignment(&ctx, &ws.alignment()).unwrap();

    let align = runner.calls.lock()[0].clone();
    let mate1 = &align[align.iter().position(|a| a == "-1").unwrap() + 1];
    let mate2 = &align[align.iter().position(|a| a == "-2").unwrap() + 1];
    let reads = ws.reads();
    assert_eq!(
        mate1,
        &format!(
            "{},{}",
            reads.join("S1_L001_R1_001.fastq").display(),
            reads.join("S1_L002_R1_001.fastq").display()
        )
    );
    assert_eq!(
        mate2,
        &format!(
            "{},{}",
            reads.join("S1_L001_R2_001.fastq").display(),
            reads.join("S1_L002_R2_001.fastq").display()
        )
    );
}

#[test]
fn mismatched_mates_fail_before_any_command() {
    let ws = Workspace::new();
    ws.touch_reads(&[
        "S1_L001_R1_001.fastq",
        "S1_L002_R1_001.fastq",
        "S1_L001_R2_001.fastq",
        "S1_L002_R2_001.fastq",
        "S1_L003_R2_001.fastq",
    ]);
    let runner = Arc::new(FakeToolchain::default());
    let ctx = ws.context(Settings::default(), runner.clone());

    let err = run_alignment(&ctx, &ws.alignment()).unwrap_err();

    match err {
        PipelineError::Resolution { source, .. } => assert!(matches!(
            source,
            ResolutionError::MatePairCountMismatch { mate1: 2, mate2: 3, .. }
        )),
        other => panic!("expected resolution error, got {other:?}"),
    }
    assert!(runner.programs().is_empty());
    assert!(!ws.output().exists());
}

#[test]
fn failing_stage_stops_the_run_and_passes_its_exit_code() {
    let ws = Workspace::new();
    ws.touch_reads(&["S1_R1.fastq", "S1_R2.fastq"]);
    let runner = Arc::new(FakeToolchain::failing("samtools", 3));
    let ctx = ws.context(Settings::default(), runner.clone());

    let err = run_alignment(&ctx, &ws.alignment()).unwrap_err();

    assert_eq!(runner.programs(), vec!["bowtie2", "samtools"]);
    assert_eq!(err.stage_name(), Some("ConvertToIndexedBinary"));
    assert_eq!(err.exit_status(), 3);
    assert!(matches!(
        err,
        PipelineError::StageFailed {
            source: StepError::CommandFailed { exit_code: 3, .. },
            ..
        }
    ));
    assert!(!ws.output().join("S1.sam").exists());
}

#[test]
fn single_end_mode_passes_every_file_unpaired() {
    let ws = Workspace::new();
    ws.touch_reads(&["S1_001.fastq", "S1_002.fastq"]);
    let mut settings = Settings::default();
    settings.samples.mode = ReadMode::Unpaired;
    let runner = Arc::new(FakeToolchain::default());
    let ctx = ws.context(settings, runner.clone());

    run_alignment(&ctx, &ws.alignment()).unwrap();

    let align = runner.calls.lock()[0].clone();
    assert!(!align.contains(&"-1".to_string()));
    let unpaired = &align[align.iter().position(|a| a == "-U").unwrap() + 1];
    assert_eq!(unpaired.split(',').count(), 2);
}

#[test]
fn diff_expression_runs_one_command_over_both_groups() {
    let ws = Workspace::new();
    let bams: Vec<PathBuf> = ["wt1.bam", "wt2.bam", "mt1.bam"]
        .iter()
        .map(|n| ws.dir.path().join(n))
        .collect();
    for bam in &bams {
        fs::write(bam, "bam").unwrap();
    }
    let request = DiffExpressionRequest {
        group_a: ReplicateGroup::new("wt", bams[..2].to_vec()),
        group_b: ReplicateGroup::new("mt", bams[2..].to_vec()),
        reference: ws.reference(),
        output_dir: ws.output().join("wt_vs_mt"),
    };
    let runner = Arc::new(FakeToolchain::default());
    let ctx = Context::new(Settings::default(), "wt_vs_mt", ws.logger("wt_vs_mt"), runner.clone());

    let result = diff_expression_pipeline(&request).run(&ctx).unwrap();

    assert_eq!(result.stage_names(), vec!["DiffExpression"]);
    let argv = runner.calls.lock()[0].clone();
    assert_eq!(argv[0], "cuffdiff");
    let labels = &argv[argv.iter().position(|a| a == "-L").unwrap() + 1];
    assert_eq!(labels, "wt,mt");
    assert!(!ws.output().join("wt_vs_mt").join(".diff.lock").exists());
    assert_eq!(
        result.produced_artifacts,
        vec![ws.output().join("wt_vs_mt").join("isoform_exp.diff")]
    );
}

#[test]
fn diff_expression_without_a_table_fails() {
    let ws = Workspace::new();
    let bams: Vec<PathBuf> = ["wt1.bam", "mt1.bam"]
        .iter()
        .map(|n| ws.dir.path().join(n))
        .collect();
    for bam in &bams {
        fs::write(bam, "bam").unwrap();
    }
    let request = DiffExpressionRequest {
        group_a: ReplicateGroup::new("wt", bams[..1].to_vec()),
        group_b: ReplicateGroup::new("mt", bams[1..].to_vec()),
        reference: ws.reference(),
        output_dir: ws.output().join("wt_vs_mt"),
    };
    let runner = Arc::new(FakeToolchain {
        silent_program: Some("cuffdiff".to_string()),
        ..FakeToolchain::default()
    });
    let ctx = Context::new(Settings::default(), "wt_vs_mt", ws.logger("wt_vs_mt"), runner);

    let err = diff_expression_pipeline(&request).run(&ctx).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StageFailed {
            source: StepError::InvalidOutput(_),
            ..
        }
    ));
}

/// Container runtime fake: `cp` materializes the artifact in staging.
#[derive(Default)]
struct FakeRuntime {
    calls: Mutex<Vec<Vec<String>>>,
}

impl CommandRunner for FakeRuntime {
    fn run(
        &self,
        invocation: &Invocation,
        _options: &RunOptions,
        _sink: &dyn OutputSink,
    ) -> RunResult<ExitOutcome> {
        let argv = invocation.argv();
        self.calls.lock().push(argv.clone());
        if argv[1] == "cp" {
            let name = argv[2].rsplit('/').next().unwrap();
            let target = Path::new(&argv[3]).join(name);
            if name.contains('.') {
                fs::write(target, "artifact").unwrap();
            } else {
                fs::create_dir_all(&target).unwrap();
                fs::write(target.join("transcripts.gtf"), "t").unwrap();
            }
        }
        Ok(ExitOutcome::new(0, Duration::ZERO))
    }
}

#[test]
fn containerized_alignment_relocates_artifacts_and_removes_container() {
    let ws = Workspace::new();
    let settings = Settings::default();
    let runtime = Arc::new(FakeRuntime::default());
    let request = ContainerAlignment {
        basename: "S1".to_string(),
        host_input_dir: ws.reads(),
        organism: "ecoli".to_string(),
        host_indexes_dir: ws.indexes(),
        local_dir: ws.dir.path().join("staging"),
        host_output_dir: ws.output(),
        threads: 4,
        trim3: 3,
    };
    let runner = ContainerRunner::new(
        settings.container.clone(),
        runtime.clone(),
        ws.logger("S1-container"),
    );

    let report = runner.run(&alignment_job(&settings, &request)).unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(report.states.last(), Some(&LifecycleState::TornDown));
    assert!(ws.output().join("S1.bam").is_file());
    assert!(ws.output().join("S1.gff").is_file());
    assert!(ws.output().join("S1").join("transcripts.gtf").is_file());
    let staging = ws.dir.path().join("staging");
    assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);

    let subcommands: Vec<String> = runtime.calls.lock().iter().map(|a| a[1].clone()).collect();
    assert_eq!(subcommands, vec!["create", "start", "cp", "cp", "cp", "rm"]);
}

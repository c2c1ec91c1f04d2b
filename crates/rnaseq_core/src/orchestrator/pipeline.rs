//! Pipeline runner that executes stages in sequence.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::lock::OutputLock;
use super::step::PipelineStep;
use super::types::{Context, ExecutionResult, StageRecord};
use crate::command::Invocation;

/// Pipeline that runs a sequence of stages.
///
/// Every stage command is built before the first one runs. Stages then
/// execute strictly in order; the first failure stops the run. Transient
/// intermediates are removed on every exit path once the lock is held.
pub struct Pipeline {
    /// Stages to execute in order.
    steps: Vec<Box<dyn PipelineStep>>,
    /// Advisory lock taken for the run.
    lock_file: Option<PathBuf>,
    /// Cancellation flag.
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            lock_file: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a stage (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Hold an advisory lock at `path` while running.
    pub fn with_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = Some(path.into());
        self
    }

    /// Get a cancellation handle.
    ///
    /// Cancelling stops the pipeline at the next stage boundary and kills
    /// a running stage command.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run the pipeline.
    ///
    /// 1. Validate options and build every command (no side effects on failure)
    /// 2. Take the output lock
    /// 3. For each stage: cancellation check, `validate_input`, execute,
    ///    `validate_output`
    /// 4. Remove transient outputs, whatever the outcome
    pub fn run(&self, ctx: &Context) -> PipelineResult<ExecutionResult> {
        let commands = self.build_commands(ctx)?;

        let _lock = match &self.lock_file {
            Some(path) => Some(OutputLock::acquire(path).map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    PipelineError::output_locked(&ctx.job_name, path)
                } else {
                    PipelineError::setup_failed(
                        &ctx.job_name,
                        format!("cannot create lock {}: {}", path.display(), e),
                    )
                }
            })?),
            None => None,
        };

        let outcome = self.run_stages(ctx, &commands);
        self.cleanup_transients(ctx);

        match &outcome {
            Ok(_) => ctx.logger.success("Pipeline completed successfully"),
            Err(e) => ctx.logger.error(&e.to_string()),
        }
        ctx.logger.flush();

        outcome
    }

    fn build_commands(&self, ctx: &Context) -> PipelineResult<Vec<Invocation>> {
        ctx.settings
            .pipeline
            .validate()
            .map_err(|e| PipelineError::configuration(&ctx.job_name, e))?;

        self.steps
            .iter()
            .map(|step| {
                step.build_command(ctx)
                    .map_err(|e| PipelineError::configuration(&ctx.job_name, e))
            })
            .collect()
    }

    fn run_stages(
        &self,
        ctx: &Context,
        commands: &[Invocation],
    ) -> PipelineResult<ExecutionResult> {
        let mut result = ExecutionResult::default();

        for (step, command) in self.steps.iter().zip(commands) {
            let step_name = step.name();

            if self.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before stage '{}'", step_name));
                return Err(PipelineError::cancelled(&ctx.job_name));
            }

            ctx.logger.stage(step_name);
            if step.description() != step_name {
                ctx.logger.info(step.description());
            }

            if let Err(e) = step.validate_input(ctx) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(PipelineError::stage_failed(&ctx.job_name, step_name, e));
            }

            let record = self
                .execute(ctx, step_name, command)
                .map_err(|e| PipelineError::stage_failed(&ctx.job_name, step_name, e))?;

            if let Err(e) = step.validate_output(ctx) {
                ctx.logger.error(&format!("Output validation failed: {}", e));
                return Err(PipelineError::stage_failed(&ctx.job_name, step_name, e));
            }

            ctx.logger.success(&format!(
                "{} completed in {:.1}s",
                step_name,
                record.duration_ms as f64 / 1000.0
            ));
            result.stages.push(record);
        }

        let transients: Vec<PathBuf> = self
            .steps
            .iter()
            .flat_map(|s| s.transient_outputs())
            .collect();
        result.produced_artifacts = self
            .steps
            .iter()
            .flat_map(|s| s.declared_outputs())
            .filter(|p| !transients.contains(p))
            .collect();

        Ok(result)
    }

    fn execute(
        &self,
        ctx: &Context,
        step_name: &str,
        command: &Invocation,
    ) -> Result<StageRecord, StepError> {
        let display = command.display();
        ctx.logger.command(&display);
        ctx.logger.arguments(&command.program, &command.args);
        ctx.logger.clear_tail();

        let options = ctx.run_options(step_name, self.cancel_handle());
        let outcome = match ctx.runner.run(command, &options, ctx.logger.as_ref()) {
            Ok(outcome) => outcome,
            Err(e) => {
                ctx.logger.show_tail(&command.program);
                return Err(e.into());
            }
        };

        if !outcome.success() {
            ctx.logger.show_tail(&command.program);
            let tail = ctx.logger.get_tail();
            let message = tail
                .last()
                .cloned()
                .unwrap_or_else(|| "no output".to_string());
            return Err(StepError::command_failed(
                &command.program,
                outcome.code,
                message,
            ));
        }

        Ok(StageRecord {
            name: step_name.to_string(),
            command: display,
            exit_code: outcome.code,
            duration_ms: outcome.duration.as_millis() as u64,
        })
    }

    /// Delete transient outputs. Failures are logged, never returned.
    fn cleanup_transients(&self, ctx: &Context) {
        if ctx.settings.execution.keep_intermediates {
            return;
        }

        for path in self.steps.iter().flat_map(|s| s.transient_outputs()) {
            match fs::remove_file(&path) {
                Ok(()) => ctx.logger.debug(&format!("Removed {}", path.display())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => ctx
                    .logger
                    .warn(&format!("Could not remove {}: {}", path.display(), e)),
            }
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get stage names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for cancelling a running pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// A handle not tied to any pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pipeline.
    ///
    /// The pipeline will stop at the next stage boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ConfigurationResult;
    use crate::config::Settings;
    use crate::logging::{JobLogger, LogConfig};
    use crate::runner::{CommandRunner, ExitOutcome, OutputSink, RunError, RunOptions, RunResult};
    use parking_lot::Mutex;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// Creates each stage's output; fails with `fail_code` on `fail_at`.
    struct ScriptedRunner {
        calls: Mutex<Vec<String>>,
        fail_at: Option<(String, i32)>,
        timeout_at: Option<String>,
    }

    impl ScriptedRunner {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_at: None,
                timeout_at: None,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(
            &self,
            invocation: &Invocation,
            _options: &RunOptions,
            sink: &dyn OutputSink,
        ) -> RunResult<ExitOutcome> {
            self.calls.lock().push(invocation.program.clone());
            sink.line(&format!("{} running", invocation.program), true);

            if self.timeout_at.as_deref() == Some(invocation.program.as_str()) {
                return Err(RunError::timeout(&invocation.program, Duration::from_secs(1)));
            }
            if let Some((program, code)) = &self.fail_at {
                if program == &invocation.program {
                    return Ok(ExitOutcome::new(*code, Duration::ZERO));
                }
            }
            if let Some(output) = invocation.args.last() {
                fs::write(output, b"x").unwrap();
            }
            Ok(ExitOutcome::new(0, Duration::from_millis(5)))
        }
    }

    /// `touch`-like stage: reads `input`, writes `output`.
    struct FileStep {
        name: &'static str,
        input: PathBuf,
        output: PathBuf,
        transient: bool,
    }

    impl PipelineStep for FileStep {
        fn name(&self) -> &str {
            self.name
        }

        fn build_command(&self, _ctx: &Context) -> ConfigurationResult<Invocation> {
            Ok(Invocation::new(self.name).arg(self.output.display().to_string()))
        }

        fn declared_inputs(&self) -> Vec<PathBuf> {
            vec![self.input.clone()]
        }

        fn declared_outputs(&self) -> Vec<PathBuf> {
            vec![self.output.clone()]
        }

        fn transient_outputs(&self) -> Vec<PathBuf> {
            if self.transient {
                vec![self.output.clone()]
            } else {
                Vec::new()
            }
        }

        fn description(&self) -> &str {
            "Touch the stage output"
        }
    }

    fn chain(dir: &Path) -> Pipeline {
        fs::write(dir.join("reads"), b"x").unwrap();
        Pipeline::new()
            .with_step(FileStep {
                name: "first",
                input: dir.join("reads"),
                output: dir.join("a"),
                transient: true,
            })
            .with_step(FileStep {
                name: "second",
                input: dir.join("a"),
                output: dir.join("b"),
                transient: false,
            })
            .with_step(FileStep {
                name: "third",
                input: dir.join("b"),
                output: dir.join("c"),
                transient: false,
            })
            .with_lock(dir.join(".run.lock"))
    }

    fn context(runner: Arc<ScriptedRunner>) -> (Context, TempDir) {
        let logs = tempdir().unwrap();
        let logger = JobLogger::new("test", logs.path(), LogConfig::default(), None).unwrap();
        (
            Context::new(Settings::default(), "test", Arc::new(logger), runner),
            logs,
        )
    }

    #[test]
    fn pipeline_builds_correctly() {
        let dir = tempdir().unwrap();
        let pipeline = chain(dir.path());

        assert_eq!(pipeline.step_count(), 3);
        assert_eq!(pipeline.step_names(), vec!["first", "second", "third"]);
    }

    #[test]
    fn runs_all_stages_in_order_and_cleans_transients() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (ctx, _logs) = context(runner.clone());

        let result = chain(dir.path()).run(&ctx).unwrap();

        assert_eq!(runner.calls(), vec!["first", "second", "third"]);
        assert_eq!(result.stage_names(), vec!["first", "second", "third"]);
        assert_eq!(result.produced_artifacts, vec![dir.path().join("b"), dir.path().join("c")]);
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join(".run.lock").exists());

        let log = fs::read_to_string(ctx.logger.log_path()).unwrap();
        assert!(log.contains("=== second ==="));
        assert!(log.contains("Touch the stage output"));
    }

    #[test]
    fn failed_stage_stops_the_run() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner {
            fail_at: Some(("second".to_string(), 3)),
            ..ScriptedRunner::new()
        });
        let (ctx, _logs) = context(runner.clone());

        let err = chain(dir.path()).run(&ctx).unwrap_err();

        assert_eq!(runner.calls(), vec!["first", "second"]);
        assert_eq!(err.stage_name(), Some("second"));
        assert_eq!(err.exit_status(), 3);
        // Transients are removed on failure too
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join(".run.lock").exists());
        assert_eq!(ctx.logger.get_tail(), vec!["second running".to_string()]);
    }

    #[test]
    fn timeout_is_reported_as_stage_failure() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner {
            timeout_at: Some("first".to_string()),
            ..ScriptedRunner::new()
        });
        let (ctx, _logs) = context(runner.clone());

        let err = chain(dir.path()).run(&ctx).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageFailed {
                source: StepError::Timeout { .. },
                ..
            }
        ));
        assert_eq!(runner.calls(), vec!["first"]);
    }

    #[test]
    fn keep_intermediates_leaves_transients() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (mut ctx, _logs) = context(runner);
        ctx.settings.execution.keep_intermediates = true;

        chain(dir.path()).run(&ctx).unwrap();
        assert!(dir.path().join("a").exists());
    }

    #[test]
    fn missing_input_fails_before_spawn() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (ctx, _logs) = context(runner.clone());

        let pipeline = Pipeline::new().with_step(FileStep {
            name: "first",
            input: dir.path().join("absent"),
            output: dir.path().join("a"),
            transient: false,
        });
        let err = pipeline.run(&ctx).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::StageFailed {
                source: StepError::FileNotFound { .. },
                ..
            }
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn directory_in_place_of_input_fails_before_spawn() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (ctx, _logs) = context(runner.clone());
        fs::create_dir(dir.path().join("S1.sam")).unwrap();

        let pipeline = Pipeline::new().with_step(FileStep {
            name: "first",
            input: dir.path().join("S1.sam"),
            output: dir.path().join("a"),
            transient: false,
        });
        let err = pipeline.run(&ctx).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::StageFailed {
                source: StepError::InvalidInput(_),
                ..
            }
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn held_lock_rejects_second_run() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (ctx, _logs) = context(runner.clone());

        let _held = OutputLock::acquire(dir.path().join(".run.lock")).unwrap();
        let err = chain(dir.path()).run(&ctx).unwrap_err();

        assert!(matches!(err, PipelineError::OutputLocked { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn invalid_options_abort_before_lock() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (mut ctx, _logs) = context(runner.clone());
        ctx.settings.pipeline.threads = 0;

        let err = chain(dir.path()).run(&ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
        assert!(!dir.path().join(".run.lock").exists());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn cancelled_pipeline_runs_nothing() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (ctx, _logs) = context(runner.clone());

        let pipeline = chain(dir.path());
        pipeline.cancel_handle().cancel();

        let err = pipeline.run(&ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn cancel_handle_works() {
        let pipeline = Pipeline::new();
        let handle = pipeline.cancel_handle();

        assert!(!pipeline.is_cancelled());
        handle.cancel();
        assert!(pipeline.is_cancelled());
        assert!(handle.is_cancelled());
    }
}

//! Container lifecycle: create, run, extract, normalize, relocate, remove.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use uuid::Uuid;

use super::errors::{ContainerError, ContainerResult};
use super::files::{normalize_permissions, relocate};
use super::types::{ContainerJob, ContainerReport, LifecycleState};
use crate::command::Invocation;
use crate::config::ContainerSettings;
use crate::logging::JobLogger;
use crate::runner::{CommandRunner, RunOptions};

/// `rnaseq-<purpose>-<yyyymmddHHMMSS>-<uuid8>`, unique per call.
pub fn container_id(purpose: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!(
        "rnaseq-{}-{}-{}",
        purpose,
        Local::now().format("%Y%m%d%H%M%S"),
        &uuid[..8]
    )
}

/// Drives a [`ContainerJob`] through its lifecycle with a container runtime.
pub struct ContainerRunner {
    settings: ContainerSettings,
    runner: Arc<dyn CommandRunner>,
    logger: Arc<JobLogger>,
}

impl ContainerRunner {
    pub fn new(
        settings: ContainerSettings,
        runner: Arc<dyn CommandRunner>,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            settings,
            runner,
            logger,
        }
    }

    /// Run the job.
    ///
    /// The container is removed exactly once whatever happens after the
    /// name is allocated. When the workload fails, extraction and
    /// relocation are still attempted so partial output can be inspected;
    /// their errors are logged and the workload error is returned.
    ///
    /// Artifacts are staged under `<staging_dir>/<container id>/`, which is
    /// removed again on every path.
    pub fn run(&self, job: &ContainerJob) -> ContainerResult<ContainerReport> {
        let id = container_id(&job.purpose);
        self.logger.section(&format!("Container {}", id));

        let area = job.staging_area(&id);
        let _staging = StagingArea::create(&area).map_err(|e| {
            ContainerError::setup(&id, format!("cannot create {}: {}", area.display(), e))
        })?;

        let guard = ContainerGuard::new(self, id.clone());
        let mut states = Vec::new();

        let outcome = self.drive(job, &id, &mut states);

        let teardown = guard.teardown();
        if teardown.is_ok() {
            states.push(LifecycleState::TornDown);
        }

        match (outcome, teardown) {
            (Ok((exit_code, relocated)), Ok(())) => Ok(ContainerReport {
                container_id: id,
                exit_code,
                relocated,
                states,
            }),
            (Ok(_), Err(teardown_err)) => Err(teardown_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown_err)) => {
                self.logger.warn(&teardown_err.to_string());
                Err(e)
            }
        }
    }

    fn drive(
        &self,
        job: &ContainerJob,
        id: &str,
        states: &mut Vec<LifecycleState>,
    ) -> ContainerResult<(i32, Vec<PathBuf>)> {
        self.create(job, id)?;
        states.push(LifecycleState::Created);

        let exec = self.start(id);
        if exec.is_ok() {
            states.push(LifecycleState::Running);
        }

        let collected = self.collect(job, id, states);

        match (exec, collected) {
            (Ok(code), Ok(relocated)) => Ok((code, relocated)),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(collect_err)) => {
                self.logger
                    .warn(&format!("Recovery after failure also failed: {}", collect_err));
                Err(e)
            }
        }
    }

    fn create(&self, job: &ContainerJob, id: &str) -> ContainerResult<()> {
        let mut create = Invocation::new(&self.settings.runtime)
            .arg("create")
            .arg("--name")
            .arg(id);
        for mount in &job.mounts {
            create = create.arg("-v").arg(mount.volume_arg());
        }
        let create = create.arg(&job.image).args(job.inner.argv());

        let code = self
            .runtime(create)
            .map_err(|msg| ContainerError::create(id, msg))?;
        if code != 0 {
            return Err(ContainerError::create(
                id,
                format!("runtime exited with code {}", code),
            ));
        }
        Ok(())
    }

    /// Run the workload attached and return its exit code.
    fn start(&self, id: &str) -> ContainerResult<i32> {
        let start = Invocation::new(&self.settings.runtime)
            .arg("start")
            .arg("-a")
            .arg(id);

        let code = self
            .runtime(start)
            .map_err(|msg| ContainerError::execution(id, None, msg))?;
        if code != 0 {
            self.logger.show_tail(id);
            return Err(ContainerError::execution(
                id,
                Some(code),
                format!("workload exited with code {}", code),
            ));
        }
        Ok(code)
    }

    /// Extract, normalize and relocate every artifact.
    fn collect(
        &self,
        job: &ContainerJob,
        id: &str,
        states: &mut Vec<LifecycleState>,
    ) -> ContainerResult<Vec<PathBuf>> {
        let area = job.staging_area(id);
        for artifact in &job.artifacts {
            let copy = Invocation::new(&self.settings.runtime)
                .arg("cp")
                .arg(format!("{}:{}", id, job.container_artifact_path(artifact)))
                .arg(area.display().to_string());

            let code = self
                .runtime(copy)
                .map_err(|msg| ContainerError::extraction(id, artifact, msg))?;
            if code != 0 {
                return Err(ContainerError::extraction(
                    id,
                    artifact,
                    format!("runtime exited with code {}", code),
                ));
            }
        }
        states.push(LifecycleState::ArtifactsExtracted);

        if self.settings.use_sudo {
            self.reclaim(&area)?;
        }
        for artifact in &job.artifacts {
            let staged = job.staged_path(id, artifact);
            normalize_permissions(&staged)
                .map_err(|e| ContainerError::permissions(&staged, e))?;
        }

        let mut relocated = Vec::with_capacity(job.artifacts.len());
        for artifact in &job.artifacts {
            let from = job.staged_path(id, artifact);
            let to = job.destination_path(artifact);
            relocate(&from, &to).map_err(|e| ContainerError::relocation(&from, &to, e))?;
            self.logger
                .debug(&format!("Moved {} to {}", from.display(), to.display()));
            relocated.push(to);
        }
        states.push(LifecycleState::Relocated);

        Ok(relocated)
    }

    /// Remove the container and its volumes.
    fn remove(&self, id: &str) -> ContainerResult<()> {
        let rm = Invocation::new(&self.settings.runtime)
            .arg("rm")
            .arg("-v")
            .arg(id);

        let code = self
            .runtime(rm)
            .map_err(|msg| ContainerError::teardown(id, msg))?;
        if code != 0 {
            return Err(ContainerError::teardown(
                id,
                format!("runtime exited with code {}", code),
            ));
        }
        Ok(())
    }

    /// Give files the runtime copied out as root back to the user owning
    /// the staging area, with the runtime's own privilege.
    fn reclaim(&self, area: &Path) -> ContainerResult<()> {
        let Some(owner) = owner_of(area) else {
            return Ok(());
        };
        let chown = Invocation::new("chown")
            .arg("-R")
            .arg(owner)
            .arg(area.display().to_string());

        let code = self
            .privileged(chown)
            .map_err(|msg| ContainerError::permissions(area, io::Error::other(msg)))?;
        if code != 0 {
            return Err(ContainerError::permissions(
                area,
                io::Error::other(format!("chown exited with code {}", code)),
            ));
        }
        Ok(())
    }

    /// Run one runtime call. `Err` carries a description when the call
    /// could not complete at all.
    fn runtime(&self, invocation: Invocation) -> Result<i32, String> {
        self.privileged(invocation)
    }

    /// Run a call under `sudo` when the runtime needs it.
    fn privileged(&self, invocation: Invocation) -> Result<i32, String> {
        let invocation = if self.settings.use_sudo {
            invocation.wrapped_in("sudo")
        } else {
            invocation
        };

        self.logger.command(&invocation.display());
        let options = RunOptions::default().with_timeout(self.settings.step_timeout());
        self.runner
            .run(&invocation, &options, self.logger.as_ref())
            .map(|outcome| outcome.code)
            .map_err(|e| e.to_string())
    }
}

#[cfg(unix)]
fn owner_of(path: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path)
        .ok()
        .map(|meta| format!("{}:{}", meta.uid(), meta.gid()))
}

#[cfg(not(unix))]
fn owner_of(_path: &Path) -> Option<String> {
    None
}

/// Per-run staging directory, removed with everything in it on drop.
struct StagingArea<'a> {
    path: &'a Path,
}

impl<'a> StagingArea<'a> {
    fn create(path: &'a Path) -> io::Result<Self> {
        fs::create_dir_all(path)?;
        Ok(Self { path })
    }
}

impl Drop for StagingArea<'_> {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Could not remove staging {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Removes the container exactly once.
///
/// `teardown` is the normal path and reports errors; `Drop` covers early
/// returns and panics and only logs.
struct ContainerGuard<'a> {
    runner: &'a ContainerRunner,
    id: String,
    removed: bool,
}

impl<'a> ContainerGuard<'a> {
    fn new(runner: &'a ContainerRunner, id: String) -> Self {
        Self {
            runner,
            id,
            removed: false,
        }
    }

    fn teardown(mut self) -> ContainerResult<()> {
        self.removed = true;
        self.runner.remove(&self.id)
    }
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(e) = self.runner.remove(&self.id) {
            tracing::warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MountSpec;
    use crate::logging::LogConfig;
    use crate::runner::{ExitOutcome, OutputSink, RunError, RunResult};
    use parking_lot::Mutex;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// Fake runtime: `cp` writes the artifact into the staging directory.
    #[derive(Default)]
    struct FakeRuntime {
        calls: Mutex<Vec<Vec<String>>>,
        start_code: i32,
        fail_cp: bool,
        fail_rm: bool,
    }

    /// Argv without a leading `sudo`.
    fn unwrapped(argv: &[String]) -> &[String] {
        if argv[0] == "sudo" {
            &argv[1..]
        } else {
            argv
        }
    }

    impl FakeRuntime {
        fn subcommands(&self) -> Vec<String> {
            self.calls
                .lock()
                .iter()
                .map(|argv| {
                    let argv = unwrapped(argv);
                    // Runtime calls are named by subcommand, anything else by program
                    if argv[0] == "docker" {
                        argv[1].clone()
                    } else {
                        argv[0].clone()
                    }
                })
                .collect()
        }

        fn count(&self, subcommand: &str) -> usize {
            self.subcommands().iter().filter(|s| *s == subcommand).count()
        }
    }

    impl CommandRunner for FakeRuntime {
        fn run(
            &self,
            invocation: &Invocation,
            _options: &RunOptions,
            _sink: &dyn OutputSink,
        ) -> RunResult<ExitOutcome> {
            let full = invocation.argv();
            self.calls.lock().push(full.clone());
            let argv = unwrapped(&full);
            let code = match argv[1].as_str() {
                "start" => self.start_code,
                "cp" if self.fail_cp => 1,
                "cp" => {
                    let source = &argv[2];
                    let name = source.rsplit('/').next().unwrap();
                    fs::write(Path::new(&argv[3]).join(name), "data").unwrap();
                    0
                }
                "rm" if self.fail_rm => {
                    return Err(RunError::timeout("docker", Duration::from_secs(1)))
                }
                _ => 0,
            };
            Ok(ExitOutcome::new(code, Duration::ZERO))
        }
    }

    struct Fixture {
        dir: TempDir,
        logger: Arc<JobLogger>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let logger =
                JobLogger::new("container", dir.path().join("logs"), LogConfig::default(), None)
                    .unwrap();
            Self {
                dir,
                logger: Arc::new(logger),
            }
        }

        fn job(&self) -> ContainerJob {
            ContainerJob {
                purpose: "align".to_string(),
                image: "example/tools".to_string(),
                mounts: vec![MountSpec::read_only("/data/fastq", "/media/fastq/")],
                inner: Invocation::new("rnaseq-pipeline").args(["align", "S1"]),
                container_output_dir: "/home/user/output/".to_string(),
                artifacts: vec!["S1.bam".to_string(), "S1.gff".to_string()],
                staging_dir: self.dir.path().join("stage"),
                destination_dir: self.dir.path().join("dest"),
            }
        }

        fn runner(&self, runtime: Arc<FakeRuntime>) -> ContainerRunner {
            ContainerRunner::new(ContainerSettings::default(), runtime, self.logger.clone())
        }
    }

    #[test]
    fn ids_are_unique_and_well_formed() {
        let a = container_id("align");
        let b = container_id("align");
        assert_ne!(a, b);
        assert!(a.starts_with("rnaseq-align-"));
        let parts: Vec<&str> = a.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[2].len(), 14);
        assert_eq!(parts[3].len(), 8);
    }

    #[test]
    fn success_runs_full_lifecycle() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime::default());
        let job = fx.job();

        let report = fx.runner(runtime.clone()).run(&job).unwrap();

        assert_eq!(runtime.subcommands(), vec!["create", "start", "cp", "cp", "rm"]);
        assert_eq!(
            report.states,
            vec![
                LifecycleState::Created,
                LifecycleState::Running,
                LifecycleState::ArtifactsExtracted,
                LifecycleState::Relocated,
                LifecycleState::TornDown,
            ]
        );
        assert!(job.destination_path("S1.bam").exists());
        assert!(job.destination_path("S1.gff").exists());
        assert!(!job.staging_area(&report.container_id).exists());

        let calls = runtime.calls.lock();
        let create = &calls[0];
        assert_eq!(&create[..4], &["docker", "create", "--name", report.container_id.as_str()]);
        assert!(create.contains(&"/data/fastq:/media/fastq/:ro".to_string()));
        assert_eq!(&create[create.len() - 3..], &["rnaseq-pipeline", "align", "S1"]);
        assert_eq!(calls[2][2], format!("{}:/home/user/output/S1.bam", report.container_id));
        assert_eq!(
            Path::new(&calls[2][3]),
            job.staging_area(&report.container_id).as_path()
        );
        assert_eq!(calls[4], vec!["docker", "rm", "-v", report.container_id.as_str()]);
    }

    #[test]
    fn inner_failure_still_extracts_and_tears_down_once() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime {
            start_code: 2,
            ..Default::default()
        });
        let job = fx.job();

        let err = fx.runner(runtime.clone()).run(&job).unwrap_err();

        assert!(matches!(err, ContainerError::ContainerExecution { exit_code: Some(2), .. }));
        assert_eq!(err.exit_status(), 2);
        assert_eq!(runtime.count("cp"), 2);
        assert_eq!(runtime.count("rm"), 1);
        assert!(job.destination_path("S1.bam").exists());
    }

    #[test]
    fn extraction_failure_tears_down_once() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime {
            fail_cp: true,
            ..Default::default()
        });

        let err = fx.runner(runtime.clone()).run(&fx.job()).unwrap_err();

        assert!(matches!(err, ContainerError::ArtifactExtraction { .. }));
        assert_eq!(runtime.count("rm"), 1);
        assert_eq!(fs::read_dir(fx.dir.path().join("stage")).unwrap().count(), 0);
    }

    #[test]
    fn leftovers_in_staging_do_not_leak_into_output() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime::default());
        let mut job = fx.job();
        job.artifacts = vec!["S1".to_string()];
        let stale = fx.dir.path().join("stage").join("S1");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("genes.fpkm_tracking"), "old").unwrap();

        fx.runner(runtime).run(&job).unwrap();

        assert_eq!(fs::read_to_string(job.destination_path("S1")).unwrap(), "data");
        assert!(stale.join("genes.fpkm_tracking").exists());
        let left: Vec<_> = fs::read_dir(fx.dir.path().join("stage"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("S1")]);
    }

    #[test]
    fn relocation_failure_tears_down_once() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime::default());
        let job = fx.job();
        // A file where the destination directory should be
        fs::write(fx.dir.path().join("dest"), "not a directory").unwrap();

        let err = fx.runner(runtime.clone()).run(&job).unwrap_err();

        assert!(matches!(err, ContainerError::Relocation { .. }));
        assert_eq!(runtime.count("rm"), 1);
    }

    #[test]
    fn teardown_failure_reported_only_when_nothing_else_failed() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime {
            fail_rm: true,
            ..Default::default()
        });
        let err = fx.runner(runtime.clone()).run(&fx.job()).unwrap_err();
        assert!(matches!(err, ContainerError::Teardown { .. }));
        assert_eq!(runtime.count("rm"), 1);

        let runtime = Arc::new(FakeRuntime {
            fail_rm: true,
            start_code: 1,
            ..Default::default()
        });
        let err = fx.runner(runtime.clone()).run(&fx.job()).unwrap_err();
        assert!(matches!(err, ContainerError::ContainerExecution { .. }));
        assert_eq!(runtime.count("rm"), 1);
    }

    #[test]
    fn sudo_prefixes_every_runtime_call() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime::default());
        let settings = ContainerSettings {
            use_sudo: true,
            ..Default::default()
        };
        let runner = ContainerRunner::new(settings, runtime.clone(), fx.logger.clone());

        let report = runner.run(&fx.job()).unwrap();
        let calls = runtime.calls.lock().clone();
        assert!(calls.iter().all(|argv| argv[0] == "sudo"));

        #[cfg(unix)]
        {
            assert_eq!(
                runtime.subcommands(),
                vec!["create", "start", "cp", "cp", "chown", "rm"]
            );
            let area = fx.job().staging_area(&report.container_id);
            assert_eq!(&calls[4][..3], &["sudo", "chown", "-R"]);
            assert_eq!(calls[4][4], area.display().to_string());
        }
    }

    #[test]
    fn ownership_is_left_alone_without_sudo() {
        let fx = Fixture::new();
        let runtime = Arc::new(FakeRuntime::default());
        fx.runner(runtime.clone()).run(&fx.job()).unwrap();
        assert_eq!(runtime.count("chown"), 0);
    }
}

//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};

use rnaseq_core::command::replicate_groups;
use rnaseq_core::config::{ConfigError, ConfigManager, Settings};
use rnaseq_core::container::{
    alignment_job, diff_expression_job, ContainerAlignment, ContainerDiffExpression,
    ContainerRunner,
};
use rnaseq_core::logging::{
    init_tracing, init_tracing_with_file, JobLogger, JobLoggerBuilder, LogConfig, LogLevel,
};
use rnaseq_core::models::{ReadMode, ReplicateGroup};
use rnaseq_core::orchestrator::{
    diff_expression_pipeline, normalization_pipeline, run_alignment, AlignmentRequest, Context,
    DiffExpressionRequest, ExecutionResult, NormalizationRequest, ReferenceIndex,
};
use rnaseq_core::results::load_diff_table;
use rnaseq_core::runner::SystemRunner;

use crate::{
    AlignArgs, AlignContainerArgs, Cli, Command, DiffArgs, DiffContainerArgs, InitConfigArgs,
    LoadDiffArgs, NormArgs,
};

/// Loaded settings plus the verbosity chosen on the command line.
struct App {
    settings: Settings,
    verbose: bool,
}

impl App {
    fn job_logger(&self, job_name: &str) -> Result<Arc<JobLogger>> {
        let logger = JobLoggerBuilder::new(job_name, &self.settings.paths.logs_folder)
            .config(LogConfig::from_settings(&self.settings.logging, self.verbose))
            .echo(Box::new(|line: &str| eprintln!("{}", line)))
            .build()
            .with_context(|| {
                format!("Failed to open run log in {}", self.settings.paths.logs_folder)
            })?;
        tracing::debug!("Run log: {}", logger.log_path().display());
        Ok(Arc::new(logger))
    }

    fn context(&self, settings: Settings, job_name: &str) -> Result<Context> {
        let logger = self.job_logger(job_name)?;
        Ok(Context::new(settings, job_name, logger, Arc::new(SystemRunner::new())))
    }

    fn reference(&self, indexes_dir: Option<&str>, organism: &str) -> ReferenceIndex {
        ReferenceIndex::new(
            indexes_dir.unwrap_or(&self.settings.paths.indexes_dir),
            organism,
            &self.settings.pipeline.index_type,
        )
    }

    /// Settings copy with command-line overrides applied.
    fn settings_with(&self, threads: Option<u32>, trim3: Option<u32>) -> Settings {
        let mut settings = self.settings.clone();
        if let Some(threads) = threads {
            settings.pipeline.threads = threads;
        }
        if let Some(trim3) = trim3 {
            settings.pipeline.trim3 = trim3;
        }
        settings
    }
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        config,
        verbose,
        command,
    } = cli;

    if let Command::InitConfig(args) = &command {
        return init_config(&config, args);
    }
    if let Command::LoadDiff(args) = &command {
        return load_diff(args);
    }

    let mut manager = ConfigManager::new(&config);
    manager
        .load_or_create()
        .with_context(|| format!("Failed to load config {}", config.display()))?;

    let level = if verbose { LogLevel::Debug } else { LogLevel::Info };
    let _log_guard = match init_tracing_with_file(level, &manager.logs_folder()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            init_tracing(level);
            tracing::warn!("File logging disabled: {}", e);
            None
        }
    };

    tracing::info!("rnaseq-pipeline v{} starting", rnaseq_core::version());
    tracing::info!("Config: {}", manager.path().display());

    if let Err(e) = manager.ensure_dirs_exist() {
        tracing::warn!("Failed to create configured directories: {}", e);
    }

    let app = App {
        settings: manager.into_settings(),
        verbose,
    };

    match command {
        Command::Align(args) => align(&app, args),
        Command::AlignContainer(args) => align_container(&app, args),
        Command::Diff(args) => diff(&app, args),
        Command::DiffContainer(args) => diff_container(&app, args),
        Command::Norm(args) => norm(&app, args),
        Command::LoadDiff(_) | Command::InitConfig(_) => Ok(()),
    }
}

fn align(app: &App, args: AlignArgs) -> Result<()> {
    let mut settings = app.settings_with(args.threads, args.trim3);
    if args.single_end {
        settings.samples.mode = ReadMode::Unpaired;
    }

    let request = AlignmentRequest {
        basename: args.basename.clone(),
        input_dir: args.input_dir,
        reference: app.reference(Some(&args.indexes_dir), &args.organism),
        output_dir: args.output_dir,
    };
    let ctx = app.context(settings, &args.basename)?;

    let result = run_alignment(&ctx, &request)?;
    print_report(&result)
}

fn align_container(app: &App, args: AlignContainerArgs) -> Result<()> {
    let job_name = format!("{}-container", args.basename);
    let logger = app.job_logger(&job_name)?;

    let job = alignment_job(
        &app.settings,
        &ContainerAlignment {
            basename: args.basename,
            host_input_dir: args.host_input_dir,
            organism: args.organism,
            host_indexes_dir: args.host_indexes_dir,
            local_dir: args.local_dir,
            host_output_dir: args.host_output_dir,
            threads: args.threads,
            trim3: args.trim3,
        },
    );

    let runner = ContainerRunner::new(
        app.settings.container.clone(),
        Arc::new(SystemRunner::new()),
        logger,
    );
    let report = runner.run(&job)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn diff(app: &App, args: DiffArgs) -> Result<()> {
    let group_a = ReplicateGroup::new(args.name_a, args.group_a);
    let group_b = ReplicateGroup::new(args.name_b, args.group_b);
    let job_name = format!("{}_vs_{}", group_a.name, group_b.name);

    let request = DiffExpressionRequest {
        group_a,
        group_b,
        reference: app.reference(args.indexes_dir.as_deref(), &args.organism),
        output_dir: args.output_dir,
    };
    let ctx = app.context(app.settings_with(args.threads, None), &job_name)?;

    let result = diff_expression_pipeline(&request).run(&ctx)?;
    print_report(&result)
}

fn diff_container(app: &App, args: DiffContainerArgs) -> Result<()> {
    let request = ContainerDiffExpression {
        group_a: ReplicateGroup::new(args.name_a, args.group_a),
        group_b: ReplicateGroup::new(args.name_b, args.group_b),
        organism: args.organism,
        host_indexes_dir: args.host_indexes_dir,
        local_dir: args.local_dir,
        host_output_dir: args.host_output_dir,
    };
    let logger = app.job_logger(&format!("{}-container", request.output_name()))?;

    let runner = ContainerRunner::new(
        app.settings.container.clone(),
        Arc::new(SystemRunner::new()),
        logger,
    );
    let report = runner.run(&diff_expression_job(&app.settings, &request))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn norm(app: &App, args: NormArgs) -> Result<()> {
    let names = split_list(&args.names);
    let groups = parse_groups(&args.groups);
    let groups = replicate_groups(&names, &groups)?;

    let request = NormalizationRequest {
        groups,
        reference: app.reference(args.indexes_dir.as_deref(), &args.organism),
        output_dir: args.output_dir,
    };
    let ctx = app.context(app.settings_with(args.threads, None), &names.join("_"))?;

    let result = normalization_pipeline(&request).run(&ctx)?;
    print_report(&result)
}

fn load_diff(args: &LoadDiffArgs) -> Result<()> {
    let table = load_diff_table(&args.path)?;

    let mut summary = serde_json::json!({
        "path": args.path,
        "rows": table.len(),
        "columns": table.columns,
        "significant": table.significant_count(),
    });
    if args.rows {
        summary["table"] = serde_json::to_value(&table)?;
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn init_config(path: &Path, args: &InitConfigArgs) -> Result<()> {
    let manager = ConfigManager::init(path, args.force).map_err(|e| match e {
        ConfigError::AlreadyExists(_) => anyhow!("{} (use --force to overwrite)", e),
        other => anyhow::Error::new(other),
    })?;
    println!("Wrote {}", manager.path().display());
    Ok(())
}

fn print_report(result: &ExecutionResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Comma-separated list, empty items dropped.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `a1,a2|b1,b2` into one replicate list per group.
fn parse_groups(value: &str) -> Vec<Vec<PathBuf>> {
    value
        .split('|')
        .map(|group| split_list(group).into_iter().map(PathBuf::from).collect())
        .collect()
}

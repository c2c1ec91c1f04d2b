//! Per-run log.
//!
//! Every line goes to `<logs>/<job>.log` and, when set, to an echo
//! callback. Tool output is kept in a bounded tail so the last lines of a
//! failing command can be replayed next to the error.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LineKind, LogCallback, LogConfig, LogLevel};

/// Where rendered lines go. One lock so file and echo never interleave
/// differently.
struct Sinks {
    file: BufWriter<File>,
    echo: Option<LogCallback>,
}

impl Sinks {
    fn emit(&mut self, line: &str) {
        // Write errors are dropped; the echo still sees the line.
        let _ = writeln!(self.file, "{}", line);
        if let Some(echo) = &self.echo {
            echo(line);
        }
    }
}

/// Last `capacity` tool output lines.
struct Tail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Tail {
    fn push(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }
}

/// Log of one pipeline or container run.
pub struct JobLogger {
    job_name: String,
    log_path: PathBuf,
    config: LogConfig,
    sinks: Mutex<Sinks>,
    tail: Mutex<Tail>,
}

impl JobLogger {
    /// Open `<log_dir>/<job_name>.log`, truncating an earlier log of the
    /// same run name.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        echo: Option<LogCallback>,
    ) -> io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", log_file_stem(&job_name)));
        let mut file = BufWriter::new(File::create(&log_path)?);
        writeln!(
            file,
            "# {} started {}",
            job_name,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;

        Ok(Self {
            job_name,
            log_path,
            tail: Mutex::new(Tail {
                lines: VecDeque::with_capacity(config.error_tail),
                capacity: config.error_tail,
            }),
            config,
            sinks: Mutex::new(Sinks { file, echo }),
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn write(&self, level: LogLevel, kind: LineKind, message: &str) {
        if level < self.config.level {
            return;
        }
        let body = kind.render(message);
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), body)
        } else {
            body
        };
        self.sinks.lock().emit(&line);
    }

    pub fn debug(&self, message: &str) {
        self.write(LogLevel::Debug, LineKind::Plain, message);
    }

    pub fn info(&self, message: &str) {
        self.write(LogLevel::Info, LineKind::Plain, message);
    }

    pub fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, LineKind::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.write(LogLevel::Error, LineKind::Error, message);
    }

    pub fn success(&self, message: &str) {
        self.write(LogLevel::Info, LineKind::Success, message);
    }

    /// Command line about to run, as a shell would accept it.
    pub fn command(&self, command_line: &str) {
        self.write(LogLevel::Info, LineKind::Command, command_line);
    }

    pub fn stage(&self, stage_name: &str) {
        self.write(LogLevel::Info, LineKind::Stage, stage_name);
    }

    pub fn section(&self, title: &str) {
        self.write(LogLevel::Info, LineKind::Section, title);
    }

    /// One argument per line at debug level, for commands with long
    /// comma-joined file lists.
    pub fn arguments(&self, program: &str, args: &[String]) {
        if LogLevel::Debug < self.config.level {
            return;
        }
        let listing = args.iter().fold(program.to_string(), |mut acc, arg| {
            acc.push_str("\n    ");
            acc.push_str(arg);
            acc
        });
        self.write(LogLevel::Debug, LineKind::Plain, &listing);
    }

    /// A line written by an external tool. Always kept in the tail; logged
    /// only outside compact mode.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        self.tail.lock().push(line);
        if !self.config.compact {
            self.write(
                LogLevel::Info,
                LineKind::ToolOutput { stderr: is_stderr },
                line,
            );
        }
    }

    /// Replay the tail under a `[<header> tail]` marker.
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }
        let mut sinks = self.sinks.lock();
        sinks.emit(&format!("[{} tail]", header));
        for line in &lines {
            sinks.emit(&format!("  | {}", line));
        }
    }

    pub fn clear_tail(&self) {
        self.tail.lock().lines.clear();
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail.lock().lines.iter().cloned().collect()
    }

    pub fn flush(&self) {
        let _ = self.sinks.lock().file.flush();
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Run names become file names: anything but `[A-Za-z0-9._-]` turns into `_`.
fn log_file_stem(job_name: &str) -> String {
    job_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Fluent construction of a [`JobLogger`].
pub struct JobLoggerBuilder {
    job_name: String,
    log_dir: PathBuf,
    config: LogConfig,
    echo: Option<LogCallback>,
}

impl JobLoggerBuilder {
    pub fn new(job_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_name: job_name.into(),
            log_dir: log_dir.into(),
            config: LogConfig::default(),
            echo: None,
        }
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Echo every line to the callback as well as the file.
    pub fn echo(mut self, echo: LogCallback) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn build(self) -> io::Result<JobLogger> {
        JobLogger::new(self.job_name, self.log_dir, self.config, self.echo)
    }
}

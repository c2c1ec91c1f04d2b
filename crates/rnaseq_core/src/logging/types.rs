//! Log levels, run log configuration and line rendering.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Severity of a run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a run log behaves.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Tool output goes only to the tail buffer, not the log.
    pub compact: bool,
    /// Tool output lines replayed when a command fails.
    pub error_tail: usize,
    /// Prefix every line with the wall-clock time.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    /// From the `[logging]` section. `verbose` forces debug lines and full
    /// tool output.
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let mut config = Self {
            level: LogLevel::Info,
            compact: settings.compact,
            error_tail: settings.error_tail as usize,
            show_timestamps: settings.show_timestamps,
        };
        if verbose {
            config.level = LogLevel::Debug;
            config.compact = false;
        }
        config
    }
}

/// Receives every rendered run log line (e.g. to echo it on a terminal).
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Shape of one run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `$ bowtie2 -X 1000 ...`
    Command,
    /// `=== Align ===`
    Stage,
    /// `--- Sample S1 ---`
    Section,
    Success,
    Warning,
    Error,
    /// A line written by an external tool.
    ToolOutput { stderr: bool },
    Plain,
}

impl LineKind {
    pub fn render(&self, message: &str) -> String {
        match self {
            LineKind::Command => format!("$ {}", message),
            LineKind::Stage => format!("=== {} ===", message),
            LineKind::Section => format!("--- {} ---", message),
            LineKind::Success => format!("[OK] {}", message),
            LineKind::Warning => format!("[WARN] {}", message),
            LineKind::Error => format!("[ERROR] {}", message),
            LineKind::ToolOutput { stderr: true } => format!("[stderr] {}", message),
            LineKind::ToolOutput { stderr: false } | LineKind::Plain => message.to_string(),
        }
    }
}

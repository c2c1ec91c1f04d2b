//! Settings file handling.
//!
//! Settings live in one TOML file with a table per concern
//! (`[paths]`, `[tools]`, `[pipeline]`, `[samples]`, `[execution]`,
//! `[container]`, `[logging]`). Every key has a default, so a partial file
//! is valid and gets completed on load.
//!
//! ```no_run
//! use rnaseq_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/rnaseq.toml");
//! config.load_or_create()?;
//!
//! config.settings_mut().pipeline.threads = 48;
//! config.update_section(ConfigSection::Pipeline)?;
//! # Ok::<(), rnaseq_core::config::ConfigError>(())
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, ContainerSettings, ExecutionSettings, LoggingSettings, PathSettings,
    PipelineConfig, SampleSettings, Settings, ToolPaths,
};

//! Reading, writing and upgrading the settings file.
//!
//! Files are always written whole to a sibling temp file and renamed into
//! place. A file with missing keys or unknown tables is rewritten on load so
//! it always shows every option with its current value.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use super::settings::{ConfigSection, Settings};
use crate::command::ConfigurationError;

/// Settings file failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigurationError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings file at one path and the settings loaded from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Manager holding defaults. Nothing is read until `load` or
    /// `load_or_create`.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Write a default settings file. Refuses to replace an existing file
    /// unless `overwrite` is set.
    pub fn init(config_path: impl Into<PathBuf>, overwrite: bool) -> ConfigResult<Self> {
        let manager = Self::new(config_path);
        if manager.config_path.exists() && !overwrite {
            return Err(ConfigError::AlreadyExists(manager.config_path));
        }
        manager.save()?;
        Ok(manager)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory changes; persist with `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Read and validate the file. It must exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        let content = fs::read_to_string(&self.config_path)?;
        self.settings = parse_settings(&content)?;
        Ok(())
    }

    /// Read the file, writing defaults first when it is missing.
    ///
    /// An existing file with missing keys or unknown tables is rewritten in
    /// full; values already set are kept.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            tracing::info!("Writing default config to {}", self.config_path.display());
            self.settings = Settings::default();
            return self.save();
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = parse_settings(&content)?;

        let doc: DocumentMut = content.parse()?;
        if !is_complete(&doc, &self.settings)? {
            tracing::debug!("Rewriting {} with every key", self.config_path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Create the output, staging and logs directories.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [&paths.output_folder, &paths.temp_root, &paths.logs_folder] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Write every section, each under its comment.
    pub fn save(&self) -> ConfigResult<()> {
        let mut doc: DocumentMut = toml::to_string_pretty(&self.settings)?.parse()?;
        for section in ConfigSection::ALL {
            if let Some(table) = doc
                .get_mut(section.table_name())
                .and_then(Item::as_table_mut)
            {
                table
                    .decor_mut()
                    .set_prefix(format!("\n{}\n", section.comment()));
            }
        }

        let mut content = String::from("# RNA-seq pipeline settings\n");
        content.push_str("# Missing keys fall back to their defaults.\n");
        content.push_str(&doc.to_string());
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Replace one table in the file on disk, leaving the others (and
    /// their comments) as they are.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc: DocumentMut = match fs::read_to_string(&self.config_path) {
            Ok(content) => content.parse()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => return Err(e.into()),
        };

        let mut table = section_table(&self.settings, section)?;
        if let Some(old) = doc.get(section.table_name()).and_then(Item::as_table) {
            table.decor_mut().clone_from(old.decor());
        }
        doc[section.table_name()] = Item::Table(table);

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.config_path)
    }
}

fn parse_settings(content: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(content)?;
    settings.pipeline.validate()?;
    Ok(settings)
}

/// One section of `settings` as a standalone TOML table.
fn section_table(settings: &Settings, section: ConfigSection) -> ConfigResult<Table> {
    let body = match section {
        ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
        ConfigSection::Tools => toml::to_string_pretty(&settings.tools)?,
        ConfigSection::Pipeline => toml::to_string_pretty(&settings.pipeline)?,
        ConfigSection::Samples => toml::to_string_pretty(&settings.samples)?,
        ConfigSection::Execution => toml::to_string_pretty(&settings.execution)?,
        ConfigSection::Container => toml::to_string_pretty(&settings.container)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
    };
    let doc: DocumentMut = body.parse()?;
    Ok(doc.as_table().clone())
}

/// True when `doc` has exactly the known tables and each holds every key
/// the full serialization of `settings` would write.
fn is_complete(doc: &DocumentMut, settings: &Settings) -> ConfigResult<bool> {
    let known = |key: &str| ConfigSection::ALL.iter().any(|s| s.table_name() == key);
    if doc.iter().any(|(key, _)| !known(key)) {
        return Ok(false);
    }

    for section in ConfigSection::ALL {
        let Some(current) = doc.get(section.table_name()).and_then(Item::as_table) else {
            return Ok(false);
        };
        let full = section_table(settings, section)?;
        if full.iter().any(|(key, _)| !current.contains_key(key)) {
            return Ok(false);
        }
    }
    Ok(true)
}

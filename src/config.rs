//! # Virtual Printer Host Configuration
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [registry]
//! printers = ["Office", "Lab"]
//! names_files = ["/etc/virtual-printer-names"]
//! default_printer = "Office"
//!
//! [output]
//! kind = "directory"
//! directory = "/var/spool/virtual-printers"
//!
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Printer name files hold one name per line. Blank lines and lines starting
//! with `#` are skipped.

// src/config.rs - Single configuration file
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::output::{DirectoryOutputProvider, MemoryOutputProvider, OutputProvider};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which printers exist at startup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub printers: Vec<String>,
    #[serde(default)]
    pub names_files: Vec<PathBuf>,
    #[serde(default)]
    pub default_printer: Option<String>,
}

impl RegistryConfig {
    /// Names from the name files in order, then the inline list. Later
    /// duplicates are dropped.
    pub fn printer_names(&self) -> Vec<String> {
        let mut names = load_printer_names(&self.names_files);
        let mut seen: HashSet<String> = names.iter().cloned().collect();
        for name in &self.printers {
            let name = name.trim();
            if !name.is_empty() && seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
        }
        names
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Memory,
    Directory,
}

/// Where printed documents end up.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub kind: OutputKind,
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: OutputKind::default(),
            directory: default_output_directory(),
        }
    }
}

impl OutputConfig {
    pub fn provider(&self) -> Arc<dyn OutputProvider> {
        match self.kind {
            OutputKind::Memory => Arc::new(MemoryOutputProvider::new()),
            OutputKind::Directory => Arc::new(DirectoryOutputProvider::new(&self.directory)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(self.level.trim())
            .map_err(|_| ConfigError::InvalidLogLevel(self.level.clone()))
    }
}

// Default value functions
fn default_output_directory() -> PathBuf { PathBuf::from("printer-output") }
fn default_bind() -> String { "127.0.0.1:3000".to_string() }
fn default_level() -> String { "info".to_string() }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            Err(ConfigError::Io(e))
        }
    }
}

/// Printer names of one name file, in file order.
pub fn parse_printer_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Reads every name file in order. Unreadable files are logged and skipped.
/// A name seen in an earlier file wins over later occurrences.
pub fn load_printer_names<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                for name in parse_printer_names(&text) {
                    if seen.insert(name.clone()) {
                        names.push(name);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to initialize printers from '{}': {}", path.display(), e);
            }
        }
    }
    names
}

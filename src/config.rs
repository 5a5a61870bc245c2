//! Server configuration.
//!
//! A plain `key = value` file with `#` comments; unknown keys are ignored
//! and missing keys fall back to defaults. Command-line flags override
//! file values in the server binary.

use crate::server::DEFAULT_PORT;
use crate::storage::{StorageError, Store};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    /// Could not read the configuration file.
    Unreadable { path: PathBuf, source: std::io::Error },
    /// A line that is neither blank, a comment, nor `key = value`.
    BadLine { line_no: usize, line: String },
    /// No usable default database location.
    Storage(StorageError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Unreadable { path, source } => {
                write!(f, "failed to open {}: {source}", path.display())
            }
            ConfigError::BadLine { line_no, line } => {
                write!(f, "bad configuration line {line_no}: {line:?}")
            }
            ConfigError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Unreadable { source, .. } => Some(source),
            ConfigError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        ConfigError::Storage(e)
    }
}

/// Where the server listens and where it keeps its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: String,
    pub database: PathBuf,
}

impl ServerConfig {
    /// Built-in defaults: all interfaces on the default port, database in
    /// the OS-standard data directory.
    pub fn defaults() -> Result<ServerConfig, ConfigError> {
        Ok(ServerConfig {
            listen: format!("0.0.0.0:{DEFAULT_PORT}"),
            database: Store::default_path()?,
        })
    }

    /// Load a configuration file over the defaults.
    pub fn load(path: &Path) -> Result<ServerConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = ServerConfig::defaults()?;
        config.apply(&text)?;
        Ok(config)
    }

    fn apply(&mut self, text: &str) -> Result<(), ConfigError> {
        for (index, raw) in text.lines().enumerate() {
            let line = match raw.split_once('#') {
                Some((before, _)) => before,
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::BadLine {
                    line_no: index + 1,
                    line: raw.to_string(),
                });
            };
            match (key.trim(), value.trim()) {
                ("listen", value) => self.listen = value.to_string(),
                ("database", value) => self.database = PathBuf::from(value),
                // Unknown keys are tolerated so one file can serve
                // several tool versions.
                _ => {}
            }
        }
        Ok(())
    }
}

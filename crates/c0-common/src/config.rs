//! Configuration structures for the compiler.
//!
//! Supports TOML deserialization. Every section falls back to defaults that
//! produce modules loadable by the reference navm virtual machine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Magic number opening every module.
pub const DEFAULT_MAGIC: u32 = 0x7230_3b3e;

/// Module format version.
pub const DEFAULT_VERSION: u32 = 1;

/// Top-level compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Module header fields.
    pub module: ModuleConfig,

    /// Program entry configuration.
    pub entry: EntryConfig,

    /// Built-in library configuration.
    pub library: LibraryConfig,

    /// Token dump configuration.
    pub tokens: TokenDumpConfig,
}

/// Binary module header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Magic number written first.
    pub magic: u32,
    /// Format version written after the magic.
    pub version: u32,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            magic: DEFAULT_MAGIC,
            version: DEFAULT_VERSION,
        }
    }
}

/// Names of the synthesized start function and the user entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Name of function 0, which runs global initializers.
    pub start: String,
    /// User function called by the start function, when declared.
    pub main: String,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            start: "_start".to_string(),
            main: "main".to_string(),
        }
    }
}

/// Built-in call-by-name library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Resolve `getint`, `putint` and friends when no user symbol shadows them.
    pub builtins: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self { builtins: true }
    }
}

/// Output format for the tokenize mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
    /// One token per line.
    #[default]
    Text,
    /// A JSON array of tokens.
    Json,
}

/// Token dump settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenDumpConfig {
    /// Output format.
    pub format: TokenFormat,
}

impl CompilerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

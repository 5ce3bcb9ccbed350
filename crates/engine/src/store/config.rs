//! Store configuration via `strand.toml`
//!
//! One flat file: where streams live, what their files are called, and how
//! often they fsync.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strand_core::{StrandError, StrandResult};
use strand_durability::{DurabilityMode, DEFAULT_EXTENSION};

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "strand.toml";

/// Store configuration loaded from `strand.toml`.
///
/// # Example
///
/// ```toml
/// data_dir = "/var/lib/strand"
/// extension = "str"
/// # "standard" = fsync every sync_interval_ms or sync_batch_size appends
/// # "always"   = fsync every append
/// durability = "standard"
/// sync_interval_ms = 100
/// sync_batch_size = 1000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one file per stream.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Stream file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Durability mode: `"standard"` or `"always"`.
    #[serde(default = "default_durability_str")]
    pub durability: String,
    /// Standard mode: maximum milliseconds between fsyncs.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Standard mode: maximum appends between fsyncs.
    #[serde(default = "default_sync_batch_size")]
    pub sync_batch_size: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_durability_str() -> String {
    "standard".to_string()
}

fn default_sync_interval_ms() -> u64 {
    100
}

fn default_sync_batch_size() -> usize {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            extension: default_extension(),
            durability: default_durability_str(),
            sync_interval_ms: default_sync_interval_ms(),
            sync_batch_size: default_sync_batch_size(),
        }
    }
}

impl StoreConfig {
    /// Default config rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::default().with_data_dir(data_dir)
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the stream file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the durability mode from a typed value.
    pub fn with_durability(mut self, mode: DurabilityMode) -> Self {
        match mode {
            DurabilityMode::Always => self.durability = "always".to_string(),
            DurabilityMode::Standard {
                interval_ms,
                batch_size,
            } => {
                self.durability = "standard".to_string();
                self.sync_interval_ms = interval_ms;
                self.sync_batch_size = batch_size;
            }
        }
        self
    }

    /// Parse the durability fields into a `DurabilityMode`.
    ///
    /// # Errors
    ///
    /// Returns an error if `durability` is not `"standard"` or `"always"`.
    pub fn durability_mode(&self) -> StrandResult<DurabilityMode> {
        match self.durability.as_str() {
            "standard" => Ok(DurabilityMode::Standard {
                interval_ms: self.sync_interval_ms,
                batch_size: self.sync_batch_size,
            }),
            "always" => Ok(DurabilityMode::Always),
            other => Err(StrandError::config(format!(
                "invalid durability mode '{}' in {}. Expected \"standard\" or \"always\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Check every field.
    pub fn validate(&self) -> StrandResult<()> {
        if self.extension.is_empty() || !self.extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(StrandError::config(format!(
                "extension '{}' must be non-empty and alphanumeric",
                self.extension
            )));
        }
        if self.sync_interval_ms == 0 {
            return Err(StrandError::config("sync_interval_ms must be greater than 0"));
        }
        if self.sync_batch_size == 0 {
            return Err(StrandError::config("sync_batch_size must be greater than 0"));
        }
        self.durability_mode()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# strand store configuration
#
# Directory holding one file per stream
data_dir = "data"

# Stream file extension (alphanumeric, no dot)
extension = "str"

# Durability mode: "standard" (default) or "always"
#   "standard" = fsync every sync_interval_ms or sync_batch_size appends
#   "always"   = fsync every append, zero data loss
durability = "standard"

# Standard mode thresholds
sync_interval_ms = 100
sync_batch_size = 1000
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> StrandResult<Self> {
        let config: StoreConfig = toml::from_str(content).map_err(|e| {
            StrandError::config(format!("failed to parse {}: {}", CONFIG_FILE_NAME, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> StrandResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StrandError::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> StrandResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> StrandResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StrandError::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

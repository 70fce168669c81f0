//! Configuration loader
//!
//! Loads codec and transport settings from a YAML file. A missing file is not
//! an error; the defaults apply.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::DEFAULT_MAX_CHAIN_BYTES;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PERSISTENT_PATH_CONFIG";

/// Config file used when the environment variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "persistent_path.yaml";

/// Digit case used when writing hex transport strings. Reading accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HexCase {
    #[default]
    Lower,
    Upper,
}

/// Codec and transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Case for `PersistentPath::to_hex_for`. Plain `to_hex` is always
    /// lower case.
    pub hex_case: HexCase,

    /// Largest chain a stream load will accept, in bytes.
    pub max_chain_bytes: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            hex_case: HexCase::Lower,
            max_chain_bytes: DEFAULT_MAX_CHAIN_BYTES,
        }
    }
}

pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create loader from PERSISTENT_PATH_CONFIG or default to
    /// "persistent_path.yaml" in the working directory
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::new(path),
            Err(_) => Self::new(DEFAULT_CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the configuration.
    pub fn load(&self) -> Result<PathConfig> {
        if !self.path.exists() {
            info!(
                "No config at {}, using defaults",
                self.path.display()
            );
            return Ok(PathConfig::default());
        }

        info!("Loading path configuration from {}", self.path.display());
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let config: PathConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        self.validate(&config)?;
        Ok(config)
    }

    fn validate(&self, config: &PathConfig) -> Result<()> {
        // Smallest chain is the one-byte legacy empty path
        if config.max_chain_bytes == 0 {
            return Err(anyhow!(
                "{}: max_chain_bytes must be at least 1",
                self.path.display()
            ));
        }
        Ok(())
    }
}

//! Project configuration for codelens.
//!
//! Read from `codelens.yaml` (or `.codelens.yaml`) in the working directory,
//! or from an explicit `--config` path. Every section is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::deadcode::DeadCodeOptions;
use crate::graph::CircularOptions;

/// File names probed by [`Config::discover`], in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["codelens.yaml", ".codelens.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub circular: CircularOptions,
    /// Glob patterns, relative to the analyzed root, to leave out of directory walks.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub dead_code: DeadCodeOptions,
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// First configuration file present in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Load `explicit` if given, else a discovered file in `dir`, else defaults.
    /// The result is validated.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        let config = match explicit.map(Path::to_path_buf).or_else(|| Self::discover(dir)) {
            Some(path) => {
                tracing::debug!(config = %path.display(), "loading configuration");
                Self::parse_file(&path)
                    .map_err(|e| anyhow::anyhow!("failed to load {}: {}", path.display(), e))?
            }
            None => Self::default(),
        };
        validate(&config)?;
        Ok(config)
    }
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.circular.max_cycle_length == 0 {
        anyhow::bail!("circular.max_cycle_length must be at least 1");
    }
    if config.circular.max_cycles == 0 {
        anyhow::bail!("circular.max_cycles must be at least 1");
    }

    for pattern in &config.exclude {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}

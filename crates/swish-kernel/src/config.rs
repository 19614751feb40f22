//! Configuration for swish.
//!
//! Configuration is loaded from `~/.config/swish/swish.toml` (or the
//! platform equivalent). Every field has a default, so a missing file or an
//! empty one is valid.
//!
//! ```toml
//! name = "swish"
//! reap = "per-segment"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// How the orchestrator reaps the processes of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReapMode {
    /// One `wait()` per spawned segment, in whatever order the host reports
    /// terminations. Statuses are not attributed to segments.
    #[default]
    Unordered,
    /// `waitpid()` on each segment in pipeline order, attributing each
    /// status to its segment.
    PerSegment,
}

/// Shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Name of this shell instance, recorded on the tracing span of every
    /// executed line. Diagnostics always use the `swish:` prefix.
    #[serde(default = "default_name")]
    pub name: String,

    /// Reaping strategy for pipeline segments.
    #[serde(default)]
    pub reap: ReapMode,
}

fn default_name() -> String {
    "swish".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            reap: ReapMode::default(),
        }
    }
}

impl ShellConfig {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "swish")
            .context("Could not determine config directory")?;

        Ok(dirs.config_dir().join("swish.toml"))
    }

    /// Set the reap mode.
    pub fn with_reap(mut self, reap: ReapMode) -> Self {
        self.reap = reap;
        self
    }
}

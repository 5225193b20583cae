use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::ledger::MatchPolicy;

pub const DEFAULT_WAIT_SECS: u64 = 10;
pub const DEFAULT_DURATION_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fallback absolute path per tool name, used when the tool is not on PATH
    #[serde(default)]
    pub tool_paths: BTreeMap<String, String>,
    /// Seconds to wait between files when `--wait` is given without a value
    #[serde(default = "default_wait_secs")]
    pub default_wait_secs: u64,
    /// Allowed |source - output| duration difference before a warning
    #[serde(default = "default_duration_tolerance")]
    pub duration_tolerance_secs: f64,
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

fn default_wait_secs() -> u64 {
    DEFAULT_WAIT_SECS
}

fn default_duration_tolerance() -> f64 {
    DEFAULT_DURATION_TOLERANCE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_paths: BTreeMap::new(),
            default_wait_secs: DEFAULT_WAIT_SECS,
            duration_tolerance_secs: DEFAULT_DURATION_TOLERANCE,
            match_policy: MatchPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        // A config written by an older version should not block a run
        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", config_path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("mbatch").join("config.json"))
    }

    pub fn set_tool_path(&mut self, tool: String, path: String) {
        self.tool_paths.insert(tool, path);
    }

    pub fn get_tool_path(&self, tool: &str) -> Option<&Path> {
        self.tool_paths.get(tool).map(Path::new)
    }

    pub fn remove_tool_path(&mut self, tool: &str) -> bool {
        self.tool_paths.remove(tool).is_some()
    }
}

// Configuration file for the tasklist CLI

use crate::task::TaskState;
use crate::view::{SortKey, StateFilter};
use eyre::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "tasklist";

/// Settings read from `config.yaml`
///
/// Every field is optional; a missing file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the task blob
    pub store_path: Option<PathBuf>,
    /// Sort applied by `list` when none is given
    pub default_sort: Option<String>,
    /// Filter applied by `list` when none is given
    pub default_filter: Option<String>,
    /// State given to new tasks when none is given
    pub default_state: Option<String>,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.yaml"))
    }

    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// Store directory: explicit override, then config, then the user data dir
    pub fn resolve_store_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.store_path.clone())
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".tasklist"))
    }

    pub fn sort(&self) -> Result<SortKey> {
        match &self.default_sort {
            Some(s) => s.parse().context("Invalid default_sort in config"),
            None => Ok(SortKey::default()),
        }
    }

    pub fn filter(&self) -> Result<StateFilter> {
        match &self.default_filter {
            Some(s) => s.parse().context("Invalid default_filter in config"),
            None => Ok(StateFilter::default()),
        }
    }

    pub fn new_task_state(&self) -> Result<TaskState> {
        match &self.default_state {
            Some(s) => s.parse().context("Invalid default_state in config"),
            None => Ok(TaskState::NotDone),
        }
    }
}

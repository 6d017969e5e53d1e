//! Node configuration schema and loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::NodeError;

/// Top-level node configuration, read from a TOML file.
///
/// Missing file means defaults; unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Directory for node state.
    pub data_dir: PathBuf,
    /// Optional directory for rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
    pub heartbeat: HeartbeatConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_dir: None,
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

/// Heartbeat feature settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeartbeatConfig {
    pub interval_secs: u64,
    pub start_delay_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            start_delay_secs: 5,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_secs(self.start_delay_secs)
    }
}

impl NodeConfig {
    /// Load from `path`, falling back to defaults if the file is absent.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

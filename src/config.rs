//! Simulation configuration.

use crate::error::ConfigError;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global simulation configuration, stored as a resource in the world.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of a spatial grid cell in world units.
    pub cell_size: f32,
    /// Upper bound on the delta applied in one tick, in seconds.
    pub max_delta: f32,
    /// Pause between loop iterations, in milliseconds.
    pub idle_sleep_ms: u64,
    /// Seconds between autosaves.
    pub autosave_interval_secs: u64,
    pub autosave_path: PathBuf,
    /// Directory of `*.json` entity templates loaded at startup.
    pub prefab_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_size: crate::spatial::DEFAULT_CELL_SIZE,
            max_delta: 0.25,
            idle_sleep_ms: 1,
            autosave_interval_secs: 300, // 5 minutes
            autosave_path: PathBuf::from("autosave.json"),
            prefab_dir: None,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::Invalid {
                field: "cell_size",
                reason: format!("must be a positive number, got {}", self.cell_size),
            });
        }
        if !(self.max_delta.is_finite() && self.max_delta > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_delta",
                reason: format!("must be a positive number, got {}", self.max_delta),
            });
        }
        Ok(())
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

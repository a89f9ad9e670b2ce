//! Engine configuration, loaded once at startup from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Startup configuration for an [`Engine`](crate::Engine).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for the shared tick pool. `0` lets rayon pick.
    pub worker_threads: usize,
    /// Entity arena pre-allocation hint per world.
    pub entity_capacity: usize,
    /// Frame-budget target used by the statistics accumulator.
    pub target_fps: u32,
    /// Whether new worlds schedule the render-collection pipeline.
    pub rendering: bool,
    /// Capacity of the replication event channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            entity_capacity: 4096,
            target_fps: 60,
            rendering: false,
            event_capacity: 2048,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    /// [`EngineError::Config`] on malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    /// [`EngineError::Io`] if the file cannot be read,
    /// [`EngineError::Config`] if it does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

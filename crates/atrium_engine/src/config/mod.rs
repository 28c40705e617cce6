//! Configuration system
//!
//! Engine settings load from TOML or RON files through the [`Config`]
//! trait. Every section is independently usable, so an embedder can
//! deserialize just the piece it cares about.

pub use serde::{Deserialize, Serialize};

use crate::tree::OctreeConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Containment check thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Movement in meters beyond which a containment check runs
    pub check_distance: f32,

    /// Seconds after which a check runs even without movement
    pub check_interval: f32,

    /// Radius in meters for the broad-phase entity query
    pub query_radius: f32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            check_distance: 0.001,
            check_interval: 0.1,
            query_radius: 0.01,
        }
    }
}

impl Config for PresenceConfig {}

/// Entity tree settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Edge length in meters of the cubic domain the octree spans
    pub world_extent: f32,

    /// Octree tuning
    pub octree: OctreeConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            world_extent: 32_768.0,
            octree: OctreeConfig::default(),
        }
    }
}

impl Config for TreeConfig {}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entity tree settings
    pub tree: TreeConfig,

    /// Containment check thresholds
    pub presence: PresenceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tree: TreeConfig::default(),
            presence: PresenceConfig::default(),
        }
    }
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Load configuration from `path`, falling back to defaults if the
    /// file is missing or malformed
    pub fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(error) => {
                log::warn!("failed to load config from {path}: {error}; using defaults");
                Self::default()
            }
        }
    }
}

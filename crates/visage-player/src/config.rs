//! Player configuration for visage-player
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/visage-player/config.yaml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use visage_core::config::EngineConfig;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Model to load: a bare name or a download URL
    pub model: String,
    /// Root of the unpacked model store
    /// Default: ~/.visage
    pub store_root: PathBuf,
    /// Engine tuning (frame cadence, event channel depth)
    pub engine: EngineConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let store_root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".visage");

        Self {
            model: "anna".to_string(),
            store_root,
            engine: EngineConfig::default(),
        }
    }
}

/// Get the default config file path
///
/// Returns: ~/.config/visage-player/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("visage-player")
        .join("config.yaml")
}

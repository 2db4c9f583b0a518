//! Engine configuration and generic YAML I/O
//!
//! `EngineConfig` carries the render-cadence and channel tuning for one
//! engine instance. The load/save helpers work with any serializable
//! configuration type; binaries layer their own config structs on them.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{BYTES_PER_SAMPLE, SAMPLE_RATE};

/// Default audio samples consumed per rendered frame (640 @ 16kHz = 25 fps)
pub const DEFAULT_SAMPLES_PER_FRAME: usize = 640;

/// Default depth of the bounded event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tuning for one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Audio samples fed to the backend per frame; sets the step cadence
    pub samples_per_frame: usize,
    /// Event channel depth; events past a stalled listener are dropped
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            samples_per_frame: DEFAULT_SAMPLES_PER_FRAME,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Bytes of PCM in one backend frame
    pub fn frame_bytes(&self) -> usize {
        self.samples_per_frame * BYTES_PER_SAMPLE
    }

    /// Wall-clock period of one render step
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(self.samples_per_frame as f64 / SAMPLE_RATE as f64)
    }

    /// Replace zero fields with defaults so the engine never divides by
    /// zero or creates an unpollable channel
    pub fn sanitized(mut self) -> Self {
        if self.samples_per_frame == 0 {
            log::warn!("config: samples_per_frame 0 replaced with default");
            self.samples_per_frame = DEFAULT_SAMPLES_PER_FRAME;
        }
        if self.event_capacity == 0 {
            log::warn!("config: event_capacity 0 replaced with default");
            self.event_capacity = DEFAULT_EVENT_CAPACITY;
        }
        self
    }
}

/// Load configuration from a YAML file.
///
/// A missing file yields the default config; an unreadable or unparseable
/// file logs a warning and yields the default config.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("config: {} not found, using defaults", path.display());
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(text) => match serde_yaml::from_str::<T>(&text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "config: failed to parse {}: {}, using defaults",
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(e) => {
            log::warn!(
                "config: failed to read {}: {}, using defaults",
                path.display(),
                e
            );
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories as needed
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("failed to serialize config")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("failed to write config file {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cadence_is_25fps() {
        let config = EngineConfig::default();
        assert_eq!(config.frame_bytes(), 1280);
        assert_eq!(config.frame_period(), Duration::from_millis(40));
    }

    #[test]
    fn test_sanitized_replaces_zeros() {
        let config = EngineConfig {
            samples_per_frame: 0,
            event_capacity: 0,
        }
        .sanitized();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: EngineConfig = load_config(Path::new("/nonexistent/visage.yaml"));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        let config = EngineConfig {
            samples_per_frame: 320,
            event_capacity: 64,
        };

        save_config(&config, &path).unwrap();
        let loaded: EngineConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "samples_per_frame: 160\n").unwrap();

        let loaded: EngineConfig = load_config(&path);
        assert_eq!(loaded.samples_per_frame, 160);
        assert_eq!(loaded.event_capacity, DEFAULT_EVENT_CAPACITY);
    }
}

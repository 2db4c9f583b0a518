//! Pure-software render backend
//!
//! `NullBackend` implements the full backend contract without GPU or native
//! code: frames are counted rather than drawn, audio playback is simulated
//! at step cadence, and motions run for a fixed number of steps. It backs
//! the demo binary and the engine tests, and stands in wherever the native
//! engine is unavailable.

use std::path::Path;

use serde::Deserialize;

use crate::types::ModelInfo;

use super::{BackendError, RenderBackend, StepSignals};

/// Init failure: model directory missing or not a directory
pub const ERR_MODEL_DIR: i32 = 101;
/// Init failure: model metadata present but unparseable
pub const ERR_MODEL_META: i32 = 102;
/// Submission failure: no model loaded
pub const ERR_NOT_LOADED: i32 = 110;

const DEFAULT_WIDTH: u32 = 540;
const DEFAULT_HEIGHT: u32 = 960;
const DEFAULT_MOTION_STEPS: u32 = 25;
const DEFAULT_COMPLETION_LAG: u32 = 2;

/// Optional `model.json` at the model directory root
#[derive(Debug, Deserialize)]
struct ModelMeta {
    name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    motions: Vec<String>,
}

/// State held while a model is loaded
struct Loaded {
    info: ModelInfo,
    volume: f32,
    /// Frames submitted but not yet consumed by a step
    pending_frames: usize,
    /// Steps since the last pending frame was consumed
    idle_steps: u32,
    /// An audio stream is in progress (frames seen, completion not yet reported)
    audio_active: bool,
    /// In-progress motion clip and its remaining steps
    motion: Option<(String, u32)>,
    frames_rendered: u64,
}

/// Software stand-in for the native avatar engine
pub struct NullBackend {
    /// Steps a motion clip runs before completing
    motion_steps: u32,
    /// Idle steps after the last audio frame before playback completes,
    /// simulating the native engine's rendering lag
    completion_lag: u32,
    loaded: Option<Loaded>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            motion_steps: DEFAULT_MOTION_STEPS,
            completion_lag: DEFAULT_COMPLETION_LAG,
            loaded: None,
        }
    }

    /// Override the fixed motion duration (steps)
    pub fn with_motion_steps(mut self, steps: u32) -> Self {
        self.motion_steps = steps.max(1);
        self
    }

    /// Override the playback completion lag (steps)
    pub fn with_completion_lag(mut self, steps: u32) -> Self {
        self.completion_lag = steps;
        self
    }

    fn loaded_mut(&mut self) -> Result<&mut Loaded, BackendError> {
        self.loaded
            .as_mut()
            .ok_or_else(|| BackendError::new(ERR_NOT_LOADED, 0, "no model loaded"))
    }

    fn read_meta(model_dir: &Path) -> Result<Option<ModelMeta>, BackendError> {
        let path = model_dir.join("model.json");
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| {
            BackendError::new(ERR_MODEL_META, 1, format!("{}: {}", path.display(), e))
        })?;
        let meta = serde_json::from_str(&text).map_err(|e| {
            BackendError::new(ERR_MODEL_META, 2, format!("{}: {}", path.display(), e))
        })?;
        Ok(Some(meta))
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for NullBackend {
    fn init(&mut self, model_dir: &Path) -> Result<ModelInfo, BackendError> {
        self.shutdown();

        if !model_dir.is_dir() {
            return Err(BackendError::new(
                ERR_MODEL_DIR,
                0,
                format!("not a model directory: {}", model_dir.display()),
            ));
        }

        let meta = Self::read_meta(model_dir)?;
        let dir_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());

        let info = match meta {
            Some(meta) => ModelInfo {
                name: meta.name.unwrap_or(dir_name),
                width: meta.width.unwrap_or(DEFAULT_WIDTH),
                height: meta.height.unwrap_or(DEFAULT_HEIGHT),
                motions: meta.motions,
            },
            None => ModelInfo {
                name: dir_name,
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
                motions: Vec::new(),
            },
        };

        log::info!(
            "null backend: loaded '{}' ({}x{}, {} motions)",
            info.name,
            info.width,
            info.height,
            info.motions.len()
        );

        self.loaded = Some(Loaded {
            info: info.clone(),
            volume: 1.0,
            pending_frames: 0,
            idle_steps: 0,
            audio_active: false,
            motion: None,
            frames_rendered: 0,
        });
        Ok(info)
    }

    fn submit_audio_frame(&mut self, pcm: &[u8]) -> Result<(), BackendError> {
        let _ = pcm;
        let loaded = self.loaded_mut()?;
        loaded.pending_frames += 1;
        loaded.audio_active = true;
        loaded.idle_steps = 0;
        Ok(())
    }

    fn submit_motion(&mut self, name: &str) -> Result<bool, BackendError> {
        let steps = self.motion_steps;
        let loaded = self.loaded_mut()?;
        if !loaded.info.has_motion(name) {
            return Ok(false);
        }
        loaded.motion = Some((name.to_string(), steps));
        Ok(true)
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.volume = volume;
        }
    }

    fn step(&mut self) -> Result<StepSignals, BackendError> {
        let completion_lag = self.completion_lag;
        let loaded = self.loaded_mut()?;
        let mut signals = StepSignals {
            rendered: true,
            ..StepSignals::default()
        };
        loaded.frames_rendered += 1;

        if loaded.pending_frames > 0 {
            loaded.pending_frames -= 1;
            loaded.idle_steps = 0;
        } else if loaded.audio_active {
            loaded.idle_steps += 1;
            if loaded.idle_steps > completion_lag {
                loaded.audio_active = false;
                loaded.idle_steps = 0;
                signals.audio_finished = true;
            }
        }

        if let Some((name, remaining)) = loaded.motion.take() {
            if remaining <= 1 {
                signals.motion_finished = Some(name);
            } else {
                loaded.motion = Some((name, remaining - 1));
            }
        }

        Ok(signals)
    }

    fn shutdown(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            log::info!(
                "null backend: released '{}' after {} frames",
                loaded.info.name,
                loaded.frames_rendered
            );
        }
    }
}

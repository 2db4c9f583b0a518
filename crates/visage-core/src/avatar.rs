//! Caller-facing avatar surface
//!
//! `Avatar` is a thin shell over the engine: every call becomes a command
//! submission, every outcome arrives through the listener. Audio and motion
//! control are split onto borrowing sub-handles so callers can hand out
//! narrow capabilities without sharing the whole avatar.
//!
//! All methods are safe from any thread and never block on the render loop.

use std::path::Path;

use crate::backend::{NullBackend, RenderBackend};
use crate::config::EngineConfig;
use crate::engine::{
    start_engine, AvatarListener, Engine, EngineCommand, EngineHandle, EngineState,
    MotionRequest, PlaybackEvent, CONFIG_ERROR_CODE,
};
use crate::error::EngineResult;
use crate::model::ModelStore;
use crate::wav;

/// A digital human driven by audio and motion commands.
///
/// Construction starts the render loop and event dispatcher threads;
/// [`Avatar::release`] (or drop) stops them. One listener receives all
/// playback events; events fired before the engine is ready to produce
/// them simply do not exist, there is no replay.
pub struct Avatar {
    engine: Engine,
    store: ModelStore,
}

impl Avatar {
    /// Avatar with default settings: software backend, models under
    /// the default store root.
    pub fn new(listener: Box<dyn AvatarListener>) -> EngineResult<Self> {
        let store = ModelStore::default_root().unwrap_or_else(|| {
            log::warn!("home directory unavailable, using ./.visage");
            ModelStore::new(".visage")
        });
        Self::with_backend(EngineConfig::default(), store, Box::new(NullBackend::new()), listener)
    }

    /// Avatar over an explicit backend, config, and model store
    pub fn with_backend(
        config: EngineConfig,
        store: ModelStore,
        backend: Box<dyn RenderBackend>,
        listener: Box<dyn AvatarListener>,
    ) -> EngineResult<Self> {
        let engine = start_engine(config, backend, listener)?;
        Ok(Self { engine, store })
    }

    fn handle(&self) -> Option<&EngineHandle> {
        self.engine.handle()
    }

    fn submit(&self, command: EngineCommand) -> bool {
        match self.handle() {
            Some(handle) => match handle.submit(command) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("engine rejected command: {}", e);
                    false
                }
            },
            None => {
                log::debug!("command after release, ignored");
                false
            }
        }
    }

    /// Load the model named by `source` (a bare name or a download URL).
    ///
    /// Resolution against the model store runs on the calling thread; the
    /// outcome arrives as `InitSucceeded` or `InitFailed`. Calling again
    /// while ready releases the current model first.
    pub fn initialize(&self, source: &str) {
        let Some(handle) = self.handle() else {
            log::debug!("initialize after release, ignored");
            return;
        };
        match self.store.resolve(source) {
            Ok(model_dir) => {
                if handle.submit(EngineCommand::Init { model_dir }).is_err() {
                    log::warn!("engine gone, init dropped");
                }
            }
            Err(e) => {
                log::error!("model resolution failed: {}", e);
                handle.emit(PlaybackEvent::InitFailed {
                    code: CONFIG_ERROR_CODE,
                    subcode: 0,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Whether playback commands currently have effect
    pub fn is_ready(&self) -> bool {
        self.handle().map(|h| h.is_ready()).unwrap_or(false)
    }

    /// Current engine lifecycle state
    pub fn state(&self) -> EngineState {
        self.handle()
            .map(|h| h.state())
            .unwrap_or(EngineState::ShuttingDown)
    }

    /// Whether an audio stream is currently playing
    pub fn is_speaking(&self) -> bool {
        self.handle().map(|h| h.is_speaking()).unwrap_or(false)
    }

    /// Last accepted output volume, 0.0 after release
    pub fn volume(&self) -> f32 {
        self.handle().map(|h| h.volume()).unwrap_or(0.0)
    }

    /// Set output volume in [0.0, 1.0]; out-of-range values are ignored
    /// and the previous volume stays in effect
    pub fn set_volume(&self, volume: f32) {
        self.submit(EngineCommand::SetVolume { volume });
    }

    /// Audio ingestion and file playback
    pub fn audio(&self) -> AudioControl<'_> {
        AudioControl { avatar: self }
    }

    /// Motion clip playback
    pub fn motion(&self) -> MotionControl<'_> {
        MotionControl { avatar: self }
    }

    /// Stop the engine and release the model. Idempotent; also runs on
    /// drop. Buffered audio is discarded, no further events fire.
    pub fn release(&mut self) {
        self.engine.shutdown();
    }
}

/// Audio surface of an [`Avatar`]
pub struct AudioControl<'a> {
    avatar: &'a Avatar,
}

impl AudioControl<'_> {
    /// Open an ingestion window for a PCM stream
    pub fn start_push(&self) {
        self.avatar.submit(EngineCommand::StartPush);
    }

    /// Append 16kHz/16-bit/mono PCM bytes to the open window.
    ///
    /// The slice is copied; the caller's buffer is free for reuse on
    /// return. Chunks from one thread reach the backend in push order.
    pub fn push_pcm(&self, pcm: &[u8]) {
        self.avatar.submit(EngineCommand::PushAudio { pcm: pcm.to_vec() });
    }

    /// Close the window; buffered audio drains before play-end fires
    pub fn stop_push(&self) {
        self.avatar.submit(EngineCommand::StopPush);
    }

    /// Play a 44-byte-header PCM file as one push cycle.
    ///
    /// Returns false without emitting events when the engine is not
    /// ready or the file is missing or holds no payload.
    pub fn play_file(&self, path: &Path) -> bool {
        if !self.avatar.is_ready() {
            log::debug!("play_file while not ready, ignored");
            return false;
        }
        let pcm = match wav::read_pcm(path) {
            Ok(pcm) => pcm,
            Err(e) => {
                log::warn!("audio file rejected: {}", e);
                return false;
            }
        };
        self.avatar.submit(EngineCommand::StartPush)
            && self.avatar.submit(EngineCommand::PushAudio { pcm })
            && self.avatar.submit(EngineCommand::StopPush)
    }

    /// Stop playback now, dropping buffered audio. Returns false when
    /// the engine is not ready to stop anything.
    pub fn stop(&self) -> bool {
        if !self.avatar.is_ready() {
            return false;
        }
        self.avatar.submit(EngineCommand::StopAudio)
    }
}

/// Motion surface of an [`Avatar`]
pub struct MotionControl<'a> {
    avatar: &'a Avatar,
}

impl MotionControl<'_> {
    /// Play a named motion clip. Immediate requests preempt the clip in
    /// flight; queued ones wait for it. Unknown names are dropped
    /// silently.
    pub fn start(&self, name: &str, immediate: bool) {
        self.avatar
            .submit(EngineCommand::Motion(Box::new(MotionRequest::named(
                name, immediate,
            ))));
    }

    /// Play a motion drawn uniformly from the model's motion table,
    /// chosen at dispatch time
    pub fn start_random(&self, immediate: bool) {
        self.avatar
            .submit(EngineCommand::Motion(Box::new(MotionRequest::random(
                immediate,
            ))));
    }
}

//! Render backend contract
//!
//! The coordination core drives an opaque rendering/animation engine through
//! this trait. The backend owns the GPU pipeline, the neural lip-sync model,
//! and frame presentation; the core owns threading, ordering, and lifecycle.
//!
//! Call discipline (enforced by the render loop, relied on by impls):
//!
//! - Every method is called from the one render-loop thread, never
//!   concurrently. The trait is `Send` so the backend can move there.
//! - `init` may be called again after `shutdown` (re-initialization).
//! - At most one audio frame and one motion submission happen between
//!   consecutive `step` calls.
//! - A `step` error is fatal: the loop stops driving the backend until a
//!   fresh `init`. Submission errors are not fatal.

mod null;

pub use null::NullBackend;

use std::path::Path;

use thiserror::Error;

use crate::types::ModelInfo;

/// Diagnostic from a failed backend call.
///
/// Code `0` is reserved for success and never appears here; nonzero codes
/// and subcodes are backend-defined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("backend error {code}/{subcode}: {message}")]
pub struct BackendError {
    pub code: i32,
    pub subcode: i32,
    pub message: String,
}

impl BackendError {
    pub fn new(code: i32, subcode: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            subcode,
            message: message.into(),
        }
    }
}

/// Completion signals collected from one render step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSignals {
    /// A frame was rendered this step
    pub rendered: bool,
    /// All submitted audio finished playing this step (reported once per
    /// stream, respecting the backend's rendering lag)
    pub audio_finished: bool,
    /// A motion clip ran to completion this step
    pub motion_finished: Option<String>,
}

/// Contract the coordination core requires from a rendering backend
pub trait RenderBackend: Send {
    /// Load the model at `model_dir` and make the backend ready to render
    fn init(&mut self, model_dir: &Path) -> Result<ModelInfo, BackendError>;

    /// Queue one fixed-size PCM frame for lip-sync playback
    fn submit_audio_frame(&mut self, pcm: &[u8]) -> Result<(), BackendError>;

    /// Start the named motion clip, replacing any clip in progress.
    /// Returns `Ok(false)` if the model does not declare the name.
    fn submit_motion(&mut self, name: &str) -> Result<bool, BackendError>;

    /// Apply an output volume in [0.0, 1.0]
    fn set_volume(&mut self, volume: f32);

    /// Render one frame and report completion signals
    fn step(&mut self) -> Result<StepSignals, BackendError>;

    /// Release the loaded model and all backend resources. Idempotent.
    fn shutdown(&mut self);
}

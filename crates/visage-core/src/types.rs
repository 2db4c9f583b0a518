//! Common types for Visage
//!
//! This module contains the fundamental types shared across the coordination
//! core: the PCM format contract and the model description produced by
//! backend initialization.

/// Sample rate the engine accepts (16kHz - the lip-sync model's native rate)
pub const SAMPLE_RATE: u32 = 16_000;

/// Bytes per PCM sample (16-bit mono)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Fixed WAV header size stripped by the file-playback path.
/// Files at or below this size carry no audio and are rejected.
pub const WAV_HEADER_LEN: usize = 44;

/// Description of a loaded avatar model, produced by backend initialization
/// and carried by the init-succeeded event.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Model name (directory name under the model root)
    pub name: String,
    /// Rendered frame width in pixels
    pub width: u32,
    /// Rendered frame height in pixels
    pub height: u32,
    /// Named motion clips this model declares
    pub motions: Vec<String>,
}

impl ModelInfo {
    /// Whether the model declares the named motion clip
    pub fn has_motion(&self, name: &str) -> bool {
        self.motions.iter().any(|m| m == name)
    }
}

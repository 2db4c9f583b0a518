//! Header-skip PCM extraction for pre-recorded audio files
//!
//! Input files are 16kHz/16-bit/mono WAV with a fixed 44-byte header. The
//! file-playback path strips that header and pushes the remainder as raw
//! PCM; nothing else of the container is interpreted.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::types::WAV_HEADER_LEN;

/// Errors from the file-playback read path
#[derive(Error, Debug)]
pub enum WavError {
    #[error("audio file not found: {0}")]
    NotFound(String),

    /// File is at or below the header size, so it carries no audio
    #[error("audio file too short ({len} bytes): {path}")]
    TooShort { path: String, len: usize },

    #[error("audio file read failed: {0}")]
    Io(#[from] io::Error),
}

/// Read a WAV file and return its PCM payload with the fixed header removed
pub fn read_pcm(path: &Path) -> Result<Vec<u8>, WavError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => WavError::NotFound(path.display().to_string()),
        _ => WavError::Io(e),
    })?;
    if bytes.len() <= WAV_HEADER_LEN {
        return Err(WavError::TooShort {
            path: path.display().to_string(),
            len: bytes.len(),
        });
    }
    Ok(bytes[WAV_HEADER_LEN..].to_vec())
}

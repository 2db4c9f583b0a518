//! Engine lifecycle states and lock-free observability
//!
//! The render loop owns the lifecycle state machine; caller threads observe
//! it (and playback progress) through `EngineAtomics` without locks.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Engine lifecycle states.
///
/// Transitions happen only inside the render loop:
///
/// ```text
/// Uninitialized --init--> Initializing --success--> Ready
/// Initializing --failure--> Failed
/// Ready --reinit--> Initializing
/// Ready --shutdown--> ShuttingDown (terminal)
/// Ready --backend fatal error--> Failed
/// Failed --init--> Initializing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
    ShuttingDown = 3,
    Failed = 4,
}

impl EngineState {
    /// Convert from the atomic representation
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => EngineState::Initializing,
            2 => EngineState::Ready,
            3 => EngineState::ShuttingDown,
            4 => EngineState::Failed,
            _ => EngineState::Uninitialized,
        }
    }

    /// Audio, motion, and volume commands only have effect here
    pub fn accepts_playback(&self) -> bool {
        matches!(self, EngineState::Ready)
    }

    /// Init commands are honored in these states (elsewhere they no-op)
    pub fn accepts_init(&self) -> bool {
        matches!(
            self,
            EngineState::Uninitialized | EngineState::Ready | EngineState::Failed
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Ready => "ready",
            EngineState::ShuttingDown => "shutting-down",
            EngineState::Failed => "failed",
        }
    }
}

/// Lock-free engine state for caller-thread reads
///
/// The render loop writes these atomics whenever the corresponding state
/// changes; caller threads read them without acquiring any lock. All
/// operations use `Ordering::Relaxed` since we only need visibility,
/// not synchronization with other memory operations.
pub struct EngineAtomics {
    /// Current lifecycle state (EngineState as u8)
    state: AtomicU8,
    /// Last accepted output volume, stored as f32 bits
    volume_bits: AtomicU32,
    /// Frames rendered since the last successful init
    frames_rendered: AtomicU64,
    /// An audio stream is in progress (between play-start and play-end)
    speaking: AtomicBool,
}

impl EngineAtomics {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(EngineState::Uninitialized as u8),
            volume_bits: AtomicU32::new(1.0f32.to_bits()),
            frames_rendered: AtomicU64::new(0),
            speaking: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state (lock-free)
    #[inline]
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Whether the engine accepts playback commands (lock-free)
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Ready
    }

    /// Last accepted output volume (lock-free)
    #[inline]
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    /// Frames rendered since the last successful init (lock-free)
    #[inline]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// Whether an audio stream is currently playing (lock-free)
    #[inline]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }

    pub(crate) fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    pub(crate) fn set_volume(&self, volume: f32) {
        self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn set_speaking(&self, speaking: bool) {
        self.speaking.store(speaking, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset_frames(&self) {
        self.frames_rendered.store(0, Ordering::Relaxed);
    }
}

impl Default for EngineAtomics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_u8_roundtrip() {
        for state in [
            EngineState::Uninitialized,
            EngineState::Initializing,
            EngineState::Ready,
            EngineState::ShuttingDown,
            EngineState::Failed,
        ] {
            assert_eq!(EngineState::from_u8(state as u8), state);
        }
        // Unknown values collapse to Uninitialized
        assert_eq!(EngineState::from_u8(200), EngineState::Uninitialized);
    }

    #[test]
    fn test_only_ready_accepts_playback() {
        assert!(EngineState::Ready.accepts_playback());
        assert!(!EngineState::Uninitialized.accepts_playback());
        assert!(!EngineState::Initializing.accepts_playback());
        assert!(!EngineState::ShuttingDown.accepts_playback());
        assert!(!EngineState::Failed.accepts_playback());
    }

    #[test]
    fn test_init_accepted_from_idle_ready_and_failed() {
        assert!(EngineState::Uninitialized.accepts_init());
        assert!(EngineState::Ready.accepts_init());
        assert!(EngineState::Failed.accepts_init());
        assert!(!EngineState::Initializing.accepts_init());
        assert!(!EngineState::ShuttingDown.accepts_init());
    }

    #[test]
    fn test_atomics_defaults() {
        let atomics = EngineAtomics::new();
        assert_eq!(atomics.state(), EngineState::Uninitialized);
        assert!(!atomics.is_ready());
        assert!(!atomics.is_speaking());
        assert_eq!(atomics.volume(), 1.0);
        assert_eq!(atomics.frames_rendered(), 0);
    }

    #[test]
    fn test_atomics_roundtrip() {
        let atomics = EngineAtomics::new();
        atomics.set_state(EngineState::Ready);
        atomics.set_volume(0.25);
        atomics.set_speaking(true);
        atomics.record_frame();
        atomics.record_frame();

        assert!(atomics.is_ready());
        assert_eq!(atomics.volume(), 0.25);
        assert!(atomics.is_speaking());
        assert_eq!(atomics.frames_rendered(), 2);

        atomics.reset_frames();
        assert_eq!(atomics.frames_rendered(), 0);
    }
}

//! Command queue between caller threads and the render loop
//!
//! This module implements the **Command Pattern** for the avatar engine:
//! any caller thread submits commands through a channel, and the render
//! loop drains them at step boundaries.
//!
//! # Why a channel?
//!
//! The render loop is the only thread allowed to touch the backend, so
//! every control operation crosses this seam:
//!
//! - Callers push commands without blocking (unbounded MPMC channel)
//! - The render loop drains pending commands at the start of each step
//! - No shared mutable state; buffers are copied on push
//!
//! Per-producer FIFO ordering comes from the channel itself; coalescing of
//! motion requests is the scheduler's job, not the queue's.
//!
//! # Usage
//!
//! ```ignore
//! let (tx, rx) = command_channel();
//!
//! // Caller thread: submit (non-blocking)
//! tx.send(EngineCommand::StartPush)?;
//!
//! // Render loop: drain at a step boundary
//! while let Ok(cmd) = rx.try_recv() { /* apply */ }
//! ```

use std::path::PathBuf;

use crossbeam::channel::{Receiver, Sender};

use super::motion::MotionRequest;

/// Commands sent from caller threads to the render loop
///
/// Each variant is one atomic operation on the engine. Commands are applied
/// at step boundaries, never mid-frame, so the backend observes a
/// consistent state per rendered frame.
pub enum EngineCommand {
    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────
    /// Load the model at a pre-validated directory and become Ready.
    /// While Ready, this tears the current model down first (re-init).
    Init { model_dir: PathBuf },
    /// Release the backend and exit the render loop. Prioritized over
    /// everything else in the same drain; pending audio is discarded.
    Shutdown,

    // ─────────────────────────────────────────────────────────────
    // Audio ingestion
    // ─────────────────────────────────────────────────────────────
    /// Open an ingestion window for a PCM stream
    StartPush,
    /// Append one PCM chunk to the open window
    ///
    /// The bytes were copied out of the caller's buffer on submission;
    /// this is the only owner.
    PushAudio { pcm: Vec<u8> },
    /// Close the window; buffered audio keeps draining to the backend
    StopPush,
    /// Stop playback now: drop buffered audio and close the window
    StopAudio,

    // ─────────────────────────────────────────────────────────────
    // Motion and output
    // ─────────────────────────────────────────────────────────────
    /// Schedule a motion clip (boxed to keep the enum small)
    Motion(Box<MotionRequest>),
    /// Set output volume; applied at the next step boundary, last write wins
    SetVolume { volume: f32 },
}

impl EngineCommand {
    /// Variant name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::Init { .. } => "Init",
            EngineCommand::Shutdown => "Shutdown",
            EngineCommand::StartPush => "StartPush",
            EngineCommand::PushAudio { .. } => "PushAudio",
            EngineCommand::StopPush => "StopPush",
            EngineCommand::StopAudio => "StopAudio",
            EngineCommand::Motion(_) => "Motion",
            EngineCommand::SetVolume { .. } => "SetVolume",
        }
    }
}

/// Create the engine command channel.
///
/// Unbounded so producers never block; depth is bounded in practice by the
/// pace of callers (one avatar submits small control values and
/// already-copied audio chunks).
pub fn command_channel() -> (Sender<EngineCommand>, Receiver<EngineCommand>) {
    crossbeam::channel::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_fifo() {
        let (tx, rx) = command_channel();

        tx.send(EngineCommand::StartPush).unwrap();
        tx.send(EngineCommand::PushAudio { pcm: vec![1, 2] }).unwrap();
        tx.send(EngineCommand::StopPush).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), EngineCommand::StartPush));
        match rx.try_recv().unwrap() {
            EngineCommand::PushAudio { pcm } => assert_eq!(pcm, vec![1, 2]),
            _ => panic!("expected PushAudio"),
        }
        assert!(matches!(rx.try_recv().unwrap(), EngineCommand::StopPush));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_command_channel_multi_producer() {
        let (tx, rx) = command_channel();
        let tx2 = tx.clone();

        let t = std::thread::spawn(move || {
            for _ in 0..100 {
                tx2.send(EngineCommand::StartPush).unwrap();
            }
        });
        for _ in 0..100 {
            tx.send(EngineCommand::StopPush).unwrap();
        }
        t.join().unwrap();

        assert_eq!(rx.try_iter().count(), 200);
    }

    #[test]
    fn test_command_size() {
        // Largest unboxed variants carry a PathBuf or Vec (24 bytes + tag).
        // MotionRequest is boxed to keep the enum within a cache line.
        let size = std::mem::size_of::<EngineCommand>();
        assert!(size <= 40, "EngineCommand is {} bytes, expected <= 40", size);
    }
}

//! Engine-level error types

use thiserror::Error;

/// Errors from engine construction and command submission
#[derive(Error, Debug)]
pub enum EngineError {
    /// Thread spawn failed (render loop or event dispatcher)
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The render loop has exited; commands have nowhere to go
    #[error("engine is shut down")]
    Closed,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

//! Error types for playback management

use thiserror::Error;

use crate::types::PlayerState;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio device rejected a command
    #[error("Audio device error: {0}")]
    Device(String),

    /// The session reached `Error` or `Closed`; a new controller is needed
    #[error("Playback session has ended in state {0:?}")]
    SessionEnded(PlayerState),

    /// Malformed request (e.g. zero repeat counts)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

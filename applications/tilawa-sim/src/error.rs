/// Simulator error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Core(#[from] tilawa_core::CoreError),

    #[error("Timings file: {0}")]
    Timings(String),

    #[error("Playback error: {0}")]
    Playback(#[from] tilawa_playback::PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

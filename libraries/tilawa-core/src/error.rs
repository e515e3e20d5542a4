//! Core error types for Tilawa

use thiserror::Error;

use crate::types::VerseKey;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Tilawa
#[derive(Error, Debug)]
pub enum CoreError {
    /// Verse key could not be parsed from `"chapter:verse"`
    #[error("Invalid verse key: {0:?}")]
    InvalidVerseKey(String),

    /// Range start comes after its end
    #[error("Invalid range: {start} comes after {end}")]
    InvertedRange {
        /// First verse of the rejected range
        start: VerseKey,
        /// Last verse of the rejected range
        end: VerseKey,
    },

    /// Range spans more than one chapter
    #[error("Invalid range: {start} and {end} are in different chapters")]
    CrossChapterRange {
        /// First verse of the rejected range
        start: VerseKey,
        /// Last verse of the rejected range
        end: VerseKey,
    },

    /// Repeat count of zero
    #[error("Invalid repeat settings: {0}")]
    InvalidRepeatSettings(String),

    /// Timing table is malformed
    #[error("Invalid verse timings: {0}")]
    InvalidTimings(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

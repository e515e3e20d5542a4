//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle state of the playback controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// Nothing requested yet
    Idle,

    /// Play requested; waiting for audio data and verse timings
    Preparing,

    /// Audio is playing
    Playing,

    /// Device is starved mid-playback
    Buffering,

    /// Device stalled and is waiting until it can play again
    WaitingCanPlay,

    /// Audio source was swapped and its data is being fetched again
    WaitingAudioData,

    /// Paused by the user or at end of audio
    Paused,

    /// Unrecoverable device failure (terminal)
    Error,

    /// Session closed (terminal)
    Closed,
}

impl PlayerState {
    /// States in which audio is (or is about to be) coming out of the device
    pub fn is_playing_family(self) -> bool {
        matches!(
            self,
            PlayerState::Playing | PlayerState::Buffering | PlayerState::WaitingCanPlay
        )
    }

    /// States that end the session
    pub fn is_terminal(self) -> bool {
        matches!(self, PlayerState::Error | PlayerState::Closed)
    }
}

/// Identifier of a repetition delay timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Shared allocator for timer ids
///
/// Every actor spawned under one controller draws from the same counter, so
/// an id from a discarded actor can never match a live one.
#[derive(Debug, Clone, Default)]
pub struct TimerIds(Arc<AtomicU64>);

impl TimerIds {
    /// Create a fresh allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused id
    pub fn allocate(&self) -> TimerId {
        TimerId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Hold next/previous requests until the device can play (default: true)
    ///
    /// When false, such requests are dropped instead.
    pub queue_navigation_until_ready: bool,

    /// Resume output when a repetition delay is cancelled mid-pause (default: true)
    pub resume_after_cancelled_delay: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            queue_navigation_until_ready: true,
            resume_after_cancelled_delay: true,
        }
    }
}

//! Playback Events
//!
//! Inbound events drive the controller; outbound events are queued for the
//! UI layer and drained with `PlaybackController::drain_events`.
//! Outbound events are emitted at key points:
//! - State changes (preparing/playing/paused/...)
//! - Verse under the playhead changed
//! - Repeat completion (verse, range, whole session)
//! - Device errors

use serde::{Deserialize, Serialize};
use tilawa_core::{RepeatRange, RepeatSettings, VerseKey, VerseTimings};

use crate::types::{PlayerState, TimerId};

/// Events accepted by the playback controller
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// Start playback, optionally from a given verse
    Play {
        /// Verse to start from; `None` keeps the current position
        verse_key: Option<VerseKey>,
    },

    /// Resume after a pause
    RequestPlay,

    /// Pause playback
    RequestPause,

    /// Jump to the next verse
    RequestNextAyah,

    /// Jump to the previous verse
    RequestPreviousAyah,

    /// Audio bytes for the current recitation are available
    AudioDataLoaded,

    /// Audio source is being replaced (e.g. reciter change)
    AudioDataCleared,

    /// Verse timing table arrived or was replaced
    UpdateVerseTimings {
        /// New table
        timings: VerseTimings,
    },

    /// Device has enough data to play
    CanPlay,

    /// Device ran out of data mid-playback
    Waiting,

    /// Device stopped fetching data
    Stalled,

    /// Device is receiving data again
    Progress,

    /// Device reached the end of the audio
    Ended,

    /// Device failed irrecoverably
    DeviceError {
        /// Device-provided description
        message: String,
    },

    /// Playhead position tick
    TimestampUpdated {
        /// Current position in milliseconds
        current_time_ms: u64,
    },

    /// A repetition delay expired
    DelayElapsed {
        /// Timer that fired
        timer: TimerId,
    },

    /// Repeat a single verse
    RepeatAyah {
        /// Verse to repeat
        verse_key: VerseKey,
        /// How to repeat it
        settings: RepeatSettings,
    },

    /// Repeat a selected range
    RepeatRange {
        /// Range to repeat
        range: RepeatRange,
        /// How to repeat it
        settings: RepeatSettings,
    },

    /// User picked a verse while repeating
    RepeatSelectedAyah {
        /// Picked verse
        verse_key: VerseKey,
    },

    /// Next verse inside the repeated range
    RepeatNextAyah,

    /// Previous verse inside the repeated range
    RepeatPrevAyah,

    /// Close the player; ends the session
    Close,
}

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Controller state changed
    StateChanged {
        /// The new state
        state: PlayerState,
    },

    /// Verse under the playhead changed
    VerseChanged {
        /// New verse, `None` between verses or outside the table
        verse_key: Option<VerseKey>,
    },

    /// A verse finished all of its repetitions
    VerseRepeatFinished {
        /// Verse that finished
        verse_key: VerseKey,
    },

    /// A range finished all of its cycles
    RangeRepeatFinished {
        /// Range that finished
        range: RepeatRange,
    },

    /// Repeat session over; normal playback resumes
    RepeatFinished,

    /// Error occurred during playback
    Error {
        /// Error message
        message: String,
    },
}

impl From<crate::actor::RepeatSignal> for PlaybackEvent {
    fn from(signal: crate::actor::RepeatSignal) -> Self {
        use crate::actor::RepeatSignal;

        match signal {
            RepeatSignal::VerseRepeatFinished { verse_key } => {
                PlaybackEvent::VerseRepeatFinished { verse_key }
            }
            RepeatSignal::RangeRepeatFinished { range } => {
                PlaybackEvent::RangeRepeatFinished { range }
            }
            RepeatSignal::RepeatFinished => PlaybackEvent::RepeatFinished,
        }
    }
}

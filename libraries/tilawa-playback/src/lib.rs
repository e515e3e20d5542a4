//! Tilawa - Playback Management
//!
//! Platform-agnostic playback lifecycle and verse repeat for recitation audio.
//!
//! This crate provides:
//! - A playback controller gating start on audio data and verse timings
//! - Buffering/stall handling and queued next/previous verse navigation
//! - Hierarchical verse repeat (verse cycle inside range cycle inside session)
//! - Optional silent delays between repetitions of a verse
//!
//! # Architecture
//!
//! Repeat machines never touch the device. Each transition returns
//! [`Effect`]s and [`RepeatSignal`]s; the [`PlaybackController`] applies the
//! effects to an [`AudioOutput`] and turns signals into [`PlaybackEvent`]s.
//!
//! # Example: Repeat a Range
//!
//! ```rust
//! use tilawa_core::{RepeatRange, RepeatSettings, VerseKey, VerseTiming, VerseTimings};
//! use tilawa_playback::{
//!     AudioOutput, PlaybackController, PlaybackEvent, PlayerConfig, PlayerEvent, Result, TimerId,
//! };
//!
//! struct SilentOutput;
//!
//! impl AudioOutput for SilentOutput {
//!     fn seek(&mut self, _position_ms: u64) -> Result<()> { Ok(()) }
//!     fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) -> Result<()> { Ok(()) }
//!     fn schedule_delay(&mut self, _timer: TimerId, _delay_ms: u64) -> Result<()> { Ok(()) }
//!     fn cancel_delay(&mut self, _timer: TimerId) {}
//! }
//!
//! let timings = VerseTimings::new(vec![
//!     VerseTiming::new(VerseKey::new(1, 1), 0, 4000),
//!     VerseTiming::new(VerseKey::new(1, 2), 4000, 9000),
//! ])?;
//!
//! let mut controller = PlaybackController::new(Box::new(SilentOutput), PlayerConfig::default());
//! controller.send(PlayerEvent::AudioDataLoaded)?;
//! controller.send(PlayerEvent::UpdateVerseTimings { timings })?;
//! controller.send(PlayerEvent::RepeatRange {
//!     range: RepeatRange::new(VerseKey::new(1, 1), VerseKey::new(1, 2))?,
//!     settings: RepeatSettings::new(1, 1, 0)?,
//! })?;
//!
//! for time_ms in [4000, 9000] {
//!     controller.send(PlayerEvent::TimestampUpdated { current_time_ms: time_ms })?;
//! }
//!
//! assert!(controller.drain_events().contains(&PlaybackEvent::RepeatFinished));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod actor;
mod controller;
mod error;
mod events;
mod output;
pub mod repeat;
pub mod types;

// Public exports
pub use actor::{Actor, ChildSlot, Effect, RepeatSignal, Transition};
pub use controller::PlaybackController;
pub use error::{PlaybackError, Result};
pub use events::{PlaybackEvent, PlayerEvent};
pub use output::AudioOutput;
pub use repeat::{RepeatEvent, RepeatOrchestrator, RepeatRequest};
pub use types::{PlayerConfig, PlayerState, TimerId, TimerIds};

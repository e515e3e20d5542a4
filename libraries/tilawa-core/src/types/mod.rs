//! Verse, timing and repeat types

mod repeat;
mod timings;
mod verse;

pub use repeat::{RepeatRange, RepeatSettings};
pub use timings::VerseTimings;
pub use verse::{VerseKey, VerseTiming, WordSegment};

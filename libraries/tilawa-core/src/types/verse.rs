//! Verse identity and per-verse timing metadata

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Verse identifier in `"chapter:verse"` form
///
/// Ordering follows reading order: chapter first, then verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerseKey {
    /// Chapter (surah) number, 1-based
    pub chapter: u16,
    /// Verse (ayah) number within the chapter, 1-based
    pub verse: u16,
}

impl VerseKey {
    /// Create a verse key
    pub fn new(chapter: u16, verse: u16) -> Self {
        Self { chapter, verse }
    }

    /// Whether both keys belong to the same chapter
    pub fn same_chapter(&self, other: &VerseKey) -> bool {
        self.chapter == other.chapter
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

impl FromStr for VerseKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidVerseKey(s.to_string());

        let (chapter, verse) = s.trim().split_once(':').ok_or_else(invalid)?;
        let chapter: u16 = chapter.parse().map_err(|_| invalid())?;
        let verse: u16 = verse.parse().map_err(|_| invalid())?;

        if chapter == 0 || verse == 0 {
            return Err(invalid());
        }

        Ok(Self { chapter, verse })
    }
}

impl TryFrom<String> for VerseKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VerseKey> for String {
    fn from(key: VerseKey) -> Self {
        key.to_string()
    }
}

/// Word-level segment: `[word_index, start_ms, end_ms]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSegment(pub u32, pub u64, pub u64);

/// Timing of one verse inside a chapter recitation
///
/// Immutable once fetched for a chapter/reciter combination; the whole
/// table is replaced when the reciter or chapter changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseTiming {
    /// Verse this record describes
    pub verse_key: VerseKey,

    /// Start of the verse audio (inclusive), in milliseconds
    pub timestamp_from: u64,

    /// End of the verse audio (exclusive), in milliseconds
    pub timestamp_to: u64,

    /// Length of the verse audio in milliseconds
    #[serde(default)]
    pub duration: u64,

    /// Word segments, in word order
    #[serde(default)]
    pub segments: Vec<WordSegment>,
}

impl VerseTiming {
    /// Create a timing record without word segments
    pub fn new(verse_key: VerseKey, timestamp_from: u64, timestamp_to: u64) -> Self {
        Self {
            verse_key,
            timestamp_from,
            timestamp_to,
            duration: timestamp_to.saturating_sub(timestamp_from),
            segments: Vec::new(),
        }
    }

    /// Whether `time_ms` falls inside `[timestamp_from, timestamp_to)`
    pub fn contains(&self, time_ms: u64) -> bool {
        time_ms >= self.timestamp_from && time_ms < self.timestamp_to
    }

    /// Whether playback at `time_ms` has reached the end of this verse
    ///
    /// A position exactly on `timestamp_to` counts as ended.
    pub fn has_ended_at(&self, time_ms: u64) -> bool {
        time_ms >= self.timestamp_to
    }
}

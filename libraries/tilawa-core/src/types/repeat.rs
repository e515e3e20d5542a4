//! Repeat request types

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::VerseKey;

/// Inclusive span of verses inside one chapter
///
/// A single-verse repeat is the degenerate range where start == end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct RepeatRange {
    start: VerseKey,
    end: VerseKey,
}

#[derive(Deserialize)]
struct RawRange {
    start: VerseKey,
    end: VerseKey,
}

impl TryFrom<RawRange> for RepeatRange {
    type Error = CoreError;

    fn try_from(raw: RawRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl RepeatRange {
    /// Create a range, rejecting inverted or cross-chapter spans
    pub fn new(start: VerseKey, end: VerseKey) -> Result<Self> {
        if !start.same_chapter(&end) {
            return Err(CoreError::CrossChapterRange { start, end });
        }
        if start > end {
            return Err(CoreError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering exactly one verse
    pub fn single(key: VerseKey) -> Self {
        Self {
            start: key,
            end: key,
        }
    }

    /// First verse of the range
    pub fn start(&self) -> VerseKey {
        self.start
    }

    /// Last verse of the range (inclusive)
    pub fn end(&self) -> VerseKey {
        self.end
    }

    /// Whether `key` lies inside the range
    pub fn contains(&self, key: &VerseKey) -> bool {
        *key >= self.start && *key <= self.end
    }

    /// Number of verses spanned
    pub fn len(&self) -> usize {
        usize::from(self.end.verse - self.start.verse) + 1
    }

    /// Always false: a range holds at least one verse
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Verse keys in reading order
    pub fn keys(&self) -> impl Iterator<Item = VerseKey> + '_ {
        (self.start.verse..=self.end.verse).map(move |verse| VerseKey::new(self.start.chapter, verse))
    }
}

/// How a repeat should be carried out
///
/// Fixed for the lifetime of one repeat session; new settings mean a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatSettings {
    /// How many times each verse plays before advancing (>= 1)
    pub verses_repeat_count: u32,

    /// How many times the whole range plays (>= 1)
    pub range_repeat_count: u32,

    /// Silence inserted between repetitions of a verse, in milliseconds
    #[serde(default)]
    pub delay_between_repetitions_ms: u64,
}

impl RepeatSettings {
    /// Create validated settings
    pub fn new(
        verses_repeat_count: u32,
        range_repeat_count: u32,
        delay_between_repetitions_ms: u64,
    ) -> Result<Self> {
        let settings = Self {
            verses_repeat_count,
            range_repeat_count,
            delay_between_repetitions_ms,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check both counts are at least one
    pub fn validate(&self) -> Result<()> {
        if self.verses_repeat_count == 0 {
            return Err(CoreError::InvalidRepeatSettings(
                "verses_repeat_count must be at least 1".to_string(),
            ));
        }
        if self.range_repeat_count == 0 {
            return Err(CoreError::InvalidRepeatSettings(
                "range_repeat_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RepeatSettings {
    fn default() -> Self {
        Self {
            verses_repeat_count: 1,
            range_repeat_count: 1,
            delay_between_repetitions_ms: 0,
        }
    }
}

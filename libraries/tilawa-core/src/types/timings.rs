//! Ordered verse timing table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::types::{RepeatRange, VerseKey, VerseTiming};

/// Timing table for one chapter recitation
///
/// Records are kept in reading order with non-decreasing start times, so
/// both key lookups and position lookups are cheap. The table is never
/// mutated: a reciter or chapter change builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<VerseTiming>", into = "Vec<VerseTiming>")]
pub struct VerseTimings {
    records: Vec<VerseTiming>,
    #[serde(skip)]
    index: HashMap<VerseKey, usize>,
}

impl VerseTimings {
    /// Build a table, validating order and boundaries
    pub fn new(records: Vec<VerseTiming>) -> Result<Self> {
        for timing in &records {
            if timing.timestamp_from > timing.timestamp_to {
                return Err(CoreError::InvalidTimings(format!(
                    "{} ends at {}ms before it starts at {}ms",
                    timing.verse_key, timing.timestamp_to, timing.timestamp_from
                )));
            }
        }

        for pair in records.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.verse_key >= next.verse_key {
                return Err(CoreError::InvalidTimings(format!(
                    "{} does not come after {}",
                    next.verse_key, prev.verse_key
                )));
            }
            if prev.timestamp_from > next.timestamp_from {
                return Err(CoreError::InvalidTimings(format!(
                    "{} starts before {}",
                    next.verse_key, prev.verse_key
                )));
            }
        }

        let index = records
            .iter()
            .enumerate()
            .map(|(i, timing)| (timing.verse_key, i))
            .collect();

        Ok(Self { records, index })
    }

    /// Parse the upstream JSON array of timing records
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<VerseTiming> = serde_json::from_str(json)?;
        Self::new(records)
    }

    /// Timing of a verse
    pub fn get(&self, key: &VerseKey) -> Option<&VerseTiming> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Whether the table has a record for `key`
    pub fn contains(&self, key: &VerseKey) -> bool {
        self.index.contains_key(key)
    }

    /// Verse after `key`, if any
    pub fn next_key(&self, key: &VerseKey) -> Option<VerseKey> {
        let i = *self.index.get(key)?;
        self.records.get(i + 1).map(|t| t.verse_key)
    }

    /// Verse before `key`, if any
    pub fn previous_key(&self, key: &VerseKey) -> Option<VerseKey> {
        let i = *self.index.get(key)?;
        i.checked_sub(1).map(|prev| self.records[prev].verse_key)
    }

    /// Verse playing at `time_ms`, using `[from, to)` boundaries
    pub fn verse_at(&self, time_ms: u64) -> Option<&VerseTiming> {
        let after = self
            .records
            .partition_point(|timing| timing.timestamp_from <= time_ms);
        let candidate = self.records.get(after.checked_sub(1)?)?;
        candidate.contains(time_ms).then_some(candidate)
    }

    /// Keys of `range` that have a timing record, in reading order
    pub fn range_keys(&self, range: &RepeatRange) -> Vec<VerseKey> {
        range.keys().filter(|key| self.contains(key)).collect()
    }

    /// First record
    pub fn first(&self) -> Option<&VerseTiming> {
        self.records.first()
    }

    /// Last record
    pub fn last(&self) -> Option<&VerseTiming> {
        self.records.last()
    }

    /// All records in reading order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &VerseTiming> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<Vec<VerseTiming>> for VerseTimings {
    type Error = CoreError;

    fn try_from(records: Vec<VerseTiming>) -> Result<Self> {
        Self::new(records)
    }
}

impl From<VerseTimings> for Vec<VerseTiming> {
    fn from(timings: VerseTimings) -> Self {
        timings.records
    }
}

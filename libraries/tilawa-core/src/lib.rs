//! Tilawa Core
//!
//! Domain types shared by every Tilawa crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Verse identity**: `VerseKey` (`"chapter:verse"`)
//! - **Timing metadata**: `VerseTiming` records and the ordered `VerseTimings` table
//! - **Repeat requests**: `RepeatRange` and `RepeatSettings`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! Timing metadata is fetched elsewhere; this crate only models it once it
//! is available as an ordered list of records.
//!
//! # Example
//!
//! ```rust
//! use tilawa_core::{RepeatRange, VerseKey, VerseTiming, VerseTimings};
//!
//! let timings = VerseTimings::new(vec![
//!     VerseTiming::new("1:1".parse().unwrap(), 0, 6000),
//!     VerseTiming::new("1:2".parse().unwrap(), 6000, 11000),
//! ])
//! .unwrap();
//!
//! let key: VerseKey = "1:2".parse().unwrap();
//! assert_eq!(timings.verse_at(6000).map(|t| t.verse_key), Some(key));
//!
//! let range = RepeatRange::new("1:1".parse().unwrap(), key).unwrap();
//! assert_eq!(timings.range_keys(&range).len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

pub use error::{CoreError, Result};

pub use types::{RepeatRange, RepeatSettings, VerseKey, VerseTiming, VerseTimings, WordSegment};

//! Tilawa simulator - headless recitation player
//!
//! Drives the playback controller against a simulated device so repeat
//! settings can be tried against real timing tables without audio.

pub mod config;
pub mod device;
pub mod error;
pub mod session;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use session::{load_timings, Simulation, TimedEvent};

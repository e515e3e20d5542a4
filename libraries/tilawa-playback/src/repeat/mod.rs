//! Nested verse repeat machines
//!
//! `RepeatOrchestrator` owns one `RangeCycleActor`, which owns one
//! `VerseCycleActor`. Ticks flow down, completion signals bubble up.

mod orchestrator;
mod range_cycle;
mod verse_cycle;

pub use orchestrator::{RepeatEvent, RepeatOrchestrator, RepeatRequest, RepeatState};
pub use range_cycle::{RangeCycleActor, RangeCycleEvent, RangeCycleState};
pub use verse_cycle::{VerseCycleActor, VerseCycleEvent, VerseCycleState};

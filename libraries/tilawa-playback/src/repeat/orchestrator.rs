//! Entry point for every repeat intent

use std::sync::Arc;

use tilawa_core::{RepeatRange, RepeatSettings, VerseKey, VerseTimings};
use tracing::{debug, info};

use crate::actor::{Actor, ChildSlot, RepeatSignal, Transition};
use crate::repeat::range_cycle::{RangeCycleActor, RangeCycleEvent};
use crate::types::{TimerId, TimerIds};

/// What the user asked to repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatRequest {
    /// Repeat one verse
    Ayah {
        /// Verse to repeat
        verse_key: VerseKey,
    },

    /// Repeat an explicit selection
    Range {
        /// Selected range
        range: RepeatRange,
    },
}

impl RepeatRequest {
    /// Normalise the request into a range
    pub fn range(&self) -> RepeatRange {
        match *self {
            RepeatRequest::Ayah { verse_key } => RepeatRange::single(verse_key),
            RepeatRequest::Range { range } => range,
        }
    }
}

/// Events understood by [`RepeatOrchestrator`]
#[derive(Debug, Clone)]
pub enum RepeatEvent {
    /// Playhead position tick
    TimestampUpdated {
        /// Current position in milliseconds
        current_time_ms: u64,
    },

    /// New timing table
    UpdateVerseTimings {
        /// Replacement table
        timings: Arc<VerseTimings>,
    },

    /// Repeat a different target with the same settings
    Repeat {
        /// New target
        request: RepeatRequest,
    },

    /// User picked a verse while repeating
    RepeatSelectedAyah {
        /// Picked verse
        verse_key: VerseKey,
    },

    /// Jump forward inside the range
    RepeatNextAyah,

    /// Jump backward inside the range
    RepeatPrevAyah,

    /// A repetition delay expired
    DelayElapsed {
        /// Timer that fired
        timer: TimerId,
    },
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatState {
    /// A range is being cycled
    InProgress,

    /// Repeat session over; playback is back to normal
    Finished,

    /// Discarded by the controller
    Stopped,
}

/// Owns the active range cycle and turns user intents into range changes
///
/// Settings are fixed for the orchestrator's lifetime.
#[derive(Debug)]
pub struct RepeatOrchestrator {
    settings: RepeatSettings,
    timings: Arc<VerseTimings>,
    range_actor: ChildSlot<RangeCycleActor>,
    timers: TimerIds,
    state: RepeatState,
}

impl RepeatOrchestrator {
    /// Start a repeat session
    ///
    /// Returns `None` when the request names verses without timings.
    pub fn spawn(
        request: RepeatRequest,
        settings: RepeatSettings,
        timings: Arc<VerseTimings>,
        timers: TimerIds,
    ) -> Option<(Self, Transition)> {
        let mut orchestrator = Self {
            settings,
            timings,
            range_actor: ChildSlot::empty(),
            timers,
            state: RepeatState::InProgress,
        };

        let transition = orchestrator.spawn_range_cycle_actor(request.range())?;
        info!(
            "Repeat started for {}-{} ({}x per verse, {}x per range)",
            request.range().start(),
            request.range().end(),
            settings.verses_repeat_count,
            settings.range_repeat_count
        );
        Some((orchestrator, transition))
    }

    /// Settings of this session
    pub fn settings(&self) -> RepeatSettings {
        self.settings
    }

    /// Range currently cycled
    pub fn active_range(&self) -> Option<RepeatRange> {
        self.range_actor.get().map(RangeCycleActor::range)
    }

    /// Active range cycle, if any
    pub fn range_actor(&self) -> Option<&RangeCycleActor> {
        self.range_actor.get()
    }

    /// Current state
    pub fn state(&self) -> RepeatState {
        self.state
    }

    fn spawn_range_cycle_actor(&mut self, range: RepeatRange) -> Option<Transition> {
        let (actor, spawned) = RangeCycleActor::spawn(
            range,
            self.settings,
            Arc::clone(&self.timings),
            self.timers.clone(),
        )?;

        let mut transition = self.range_actor.replace(actor);
        transition.merge(spawned);
        Some(transition)
    }

    fn forward_to_range_cycle_actor(&mut self, event: RangeCycleEvent) -> Transition {
        let mut transition = self.range_actor.send(event);
        if transition.has_range_finished() {
            transition.merge(self.finish());
        }
        transition
    }

    fn finish(&mut self) -> Transition {
        info!("Repeat finished");
        let mut transition = self.range_actor.clear();
        self.state = RepeatState::Finished;
        transition.push_signal(RepeatSignal::RepeatFinished);
        transition
    }
}

impl Actor for RepeatOrchestrator {
    type Event = RepeatEvent;

    fn send(&mut self, event: RepeatEvent) -> Transition {
        if self.state != RepeatState::InProgress {
            return Transition::none();
        }

        match event {
            RepeatEvent::TimestampUpdated { current_time_ms } => self
                .forward_to_range_cycle_actor(RangeCycleEvent::TimestampUpdated { current_time_ms }),
            RepeatEvent::UpdateVerseTimings { timings } => {
                self.timings = Arc::clone(&timings);
                self.forward_to_range_cycle_actor(RangeCycleEvent::UpdateVerseTimings { timings })
            }
            RepeatEvent::Repeat { request } => self
                .spawn_range_cycle_actor(request.range())
                .unwrap_or_default(),
            RepeatEvent::RepeatSelectedAyah { verse_key } => {
                let in_range = self
                    .active_range()
                    .is_some_and(|range| range.contains(&verse_key));
                if in_range {
                    self.forward_to_range_cycle_actor(RangeCycleEvent::RepeatSelectedAyah {
                        verse_key,
                    })
                } else {
                    debug!("Selected verse {} leaves the repeated range", verse_key);
                    self.finish()
                }
            }
            RepeatEvent::RepeatNextAyah => {
                self.forward_to_range_cycle_actor(RangeCycleEvent::RepeatNextAyah)
            }
            RepeatEvent::RepeatPrevAyah => {
                self.forward_to_range_cycle_actor(RangeCycleEvent::RepeatPrevAyah)
            }
            RepeatEvent::DelayElapsed { timer } => {
                self.forward_to_range_cycle_actor(RangeCycleEvent::DelayElapsed { timer })
            }
        }
    }

    fn stop(&mut self) -> Transition {
        self.state = RepeatState::Stopped;
        self.range_actor.clear()
    }

    fn is_finished(&self) -> bool {
        self.state == RepeatState::Finished
    }
}

//! Repeats one verse a fixed number of times

use tilawa_core::{RepeatSettings, VerseTiming};
use tracing::debug;

use crate::actor::{Actor, Effect, RepeatSignal, Transition};
use crate::types::{TimerId, TimerIds};

/// Events understood by [`VerseCycleActor`]
#[derive(Debug, Clone, PartialEq)]
pub enum VerseCycleEvent {
    /// Playhead position tick
    TimestampUpdated {
        /// Current position in milliseconds
        current_time_ms: u64,
    },

    /// Refreshed timing for this actor's verse
    UpdateVerseTiming {
        /// New timing; ignored unless it names the same verse
        timing: VerseTiming,
    },

    /// A repetition delay expired
    DelayElapsed {
        /// Timer that fired
        timer: TimerId,
    },
}

/// Verse cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerseCycleState {
    /// Verse is playing
    InProgress,

    /// Paused between two repetitions
    Delaying {
        /// Timer whose expiry resumes playback
        timer: TimerId,
    },

    /// All repetitions done
    Finished,

    /// Discarded by the parent
    Stopped,
}

/// Replays a single verse segment `verses_repeat_count` times
///
/// The actor only ever judges its own verse boundary; crossing into the next
/// verse is the parent's business.
#[derive(Debug)]
pub struct VerseCycleActor {
    timing: VerseTiming,
    repeat_count: u32,
    repeats_so_far: u32,
    delay_ms: u64,
    timers: TimerIds,
    state: VerseCycleState,
}

impl VerseCycleActor {
    /// Spawn an actor for `timing`
    pub fn spawn(timing: VerseTiming, settings: &RepeatSettings, timers: TimerIds) -> Self {
        debug!(
            "Verse cycle spawned for {} ({} plays)",
            timing.verse_key, settings.verses_repeat_count
        );

        Self {
            timing,
            repeat_count: settings.verses_repeat_count.max(1),
            repeats_so_far: 0,
            delay_ms: settings.delay_between_repetitions_ms,
            timers,
            state: VerseCycleState::InProgress,
        }
    }

    /// Timing currently in use
    pub fn timing(&self) -> &VerseTiming {
        &self.timing
    }

    /// Repetitions already started after the first play
    pub fn repeats_so_far(&self) -> u32 {
        self.repeats_so_far
    }

    /// Current state
    pub fn state(&self) -> VerseCycleState {
        self.state
    }

    fn verse_repeat_on_progress(&self) -> bool {
        self.repeats_so_far + 1 < self.repeat_count
    }

    fn on_verse_ended(&mut self) -> Transition {
        if !self.verse_repeat_on_progress() {
            debug!("Verse {} finished repeating", self.timing.verse_key);
            self.state = VerseCycleState::Finished;
            return Transition::signal(RepeatSignal::VerseRepeatFinished {
                verse_key: self.timing.verse_key,
            });
        }

        self.repeats_so_far += 1;
        debug!(
            "Repeating verse {} ({}/{})",
            self.timing.verse_key,
            self.repeats_so_far + 1,
            self.repeat_count
        );

        if self.delay_ms == 0 {
            return Transition::effect(Effect::Seek {
                time_ms: self.timing.timestamp_from,
            });
        }

        let timer = self.timers.allocate();
        self.state = VerseCycleState::Delaying { timer };

        let mut transition = Transition::effect(Effect::Pause);
        transition.push_effect(Effect::ScheduleDelay {
            timer,
            delay_ms: self.delay_ms,
        });
        transition
    }
}

impl Actor for VerseCycleActor {
    type Event = VerseCycleEvent;

    fn send(&mut self, event: VerseCycleEvent) -> Transition {
        match (self.state, event) {
            (VerseCycleState::InProgress, VerseCycleEvent::TimestampUpdated { current_time_ms }) => {
                if self.timing.has_ended_at(current_time_ms) {
                    self.on_verse_ended()
                } else {
                    Transition::none()
                }
            }
            (
                VerseCycleState::InProgress | VerseCycleState::Delaying { .. },
                VerseCycleEvent::UpdateVerseTiming { timing },
            ) => {
                if timing.verse_key == self.timing.verse_key {
                    self.timing = timing;
                }
                Transition::none()
            }
            (VerseCycleState::Delaying { timer }, VerseCycleEvent::DelayElapsed { timer: fired })
                if timer == fired =>
            {
                self.state = VerseCycleState::InProgress;
                let mut transition = Transition::effect(Effect::Seek {
                    time_ms: self.timing.timestamp_from,
                });
                transition.push_effect(Effect::Play);
                transition
            }
            _ => Transition::none(),
        }
    }

    fn stop(&mut self) -> Transition {
        let previous = std::mem::replace(&mut self.state, VerseCycleState::Stopped);
        match previous {
            VerseCycleState::Delaying { timer } => Transition::effect(Effect::CancelDelay { timer }),
            _ => Transition::none(),
        }
    }

    fn is_finished(&self) -> bool {
        self.state == VerseCycleState::Finished
    }
}

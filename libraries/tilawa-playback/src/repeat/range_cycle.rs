//! Walks a verse range, one verse cycle at a time

use std::sync::Arc;

use tilawa_core::{RepeatRange, RepeatSettings, VerseKey, VerseTimings};
use tracing::{debug, warn};

use crate::actor::{Actor, ChildSlot, Effect, RepeatSignal, Transition};
use crate::repeat::verse_cycle::{VerseCycleActor, VerseCycleEvent};
use crate::types::{TimerId, TimerIds};

/// Events understood by [`RangeCycleActor`]
#[derive(Debug, Clone)]
pub enum RangeCycleEvent {
    /// Playhead position tick
    TimestampUpdated {
        /// Current position in milliseconds
        current_time_ms: u64,
    },

    /// New timing table (reciter or chapter change)
    UpdateVerseTimings {
        /// Replacement table
        timings: Arc<VerseTimings>,
    },

    /// Jump to the next verse of the range
    RepeatNextAyah,

    /// Jump to the previous verse of the range
    RepeatPrevAyah,

    /// Jump to a specific verse of the range
    RepeatSelectedAyah {
        /// Requested verse
        verse_key: VerseKey,
    },

    /// A repetition delay expired
    DelayElapsed {
        /// Timer that fired
        timer: TimerId,
    },
}

/// Range cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCycleState {
    /// A verse of the range is being repeated
    InProgress,

    /// Every cycle is done
    Finished,

    /// Discarded by the parent
    Stopped,
}

/// Plays every verse of a range, then the range again until its cycles run out
#[derive(Debug)]
pub struct RangeCycleActor {
    range: RepeatRange,
    settings: RepeatSettings,
    timings: Arc<VerseTimings>,
    keys: Vec<VerseKey>,
    position: usize,
    cycles_so_far: u32,
    child: ChildSlot<VerseCycleActor>,
    timers: TimerIds,
    state: RangeCycleState,
}

impl RangeCycleActor {
    /// Spawn an actor for `range`, seeking to its first verse
    ///
    /// Returns `None` when the range's first or last verse has no timing.
    pub fn spawn(
        range: RepeatRange,
        settings: RepeatSettings,
        timings: Arc<VerseTimings>,
        timers: TimerIds,
    ) -> Option<(Self, Transition)> {
        if !timings.contains(&range.start()) || !timings.contains(&range.end()) {
            debug!("No timings for range {}-{}, ignoring", range.start(), range.end());
            return None;
        }

        let keys = timings.range_keys(&range);
        let mut actor = Self {
            range,
            settings,
            timings,
            keys,
            position: 0,
            cycles_so_far: 0,
            child: ChildSlot::empty(),
            timers,
            state: RangeCycleState::InProgress,
        };

        debug!(
            "Range cycle spawned for {}-{} ({} verses, {} cycles)",
            range.start(),
            range.end(),
            actor.keys.len(),
            settings.range_repeat_count
        );

        let transition = actor.spawn_verse_cycle_actor(true);
        Some((actor, transition))
    }

    /// Range being cycled
    pub fn range(&self) -> RepeatRange {
        self.range
    }

    /// Verse whose cycle is active
    pub fn current_verse(&self) -> VerseKey {
        self.keys[self.position]
    }

    /// Range cycles already restarted
    pub fn cycles_so_far(&self) -> u32 {
        self.cycles_so_far
    }

    /// Active verse cycle, if any
    pub fn verse_actor(&self) -> Option<&VerseCycleActor> {
        self.child.get()
    }

    /// Current state
    pub fn state(&self) -> RangeCycleState {
        self.state
    }

    fn range_ended(&self) -> bool {
        self.position + 1 >= self.keys.len()
    }

    fn range_cycle_finished(&self) -> bool {
        self.cycles_so_far + 1 >= self.settings.range_repeat_count
    }

    fn selected_ayah_is_not_in_range(&self, verse_key: &VerseKey) -> bool {
        !self.range.contains(verse_key)
    }

    /// Replace the child with a fresh cycle for the current verse
    fn spawn_verse_cycle_actor(&mut self, seek_to_start: bool) -> Transition {
        let key = self.current_verse();
        let Some(timing) = self.timings.get(&key).cloned() else {
            return self.child.clear();
        };

        let start = timing.timestamp_from;
        let mut transition = self.child.replace(VerseCycleActor::spawn(
            timing,
            &self.settings,
            self.timers.clone(),
        ));
        if seek_to_start {
            transition.push_effect(Effect::Seek { time_ms: start });
        }
        transition
    }

    /// Forward a tick to the child, following natural advances across verses
    fn forward_timestamp_to_verse_actor(&mut self, current_time_ms: u64) -> Transition {
        let mut transition = Transition::none();

        loop {
            let step = self
                .child
                .send(VerseCycleEvent::TimestampUpdated { current_time_ms });
            let verse_finished = step.has_verse_finished();
            transition.merge(step);

            if !verse_finished {
                break;
            }

            if self.range_ended() {
                transition.merge(self.on_range_ended());
                break;
            }

            // No seek: playback already flows into the next verse, so the
            // same tick is judged again by the new child.
            self.position += 1;
            transition.merge(self.spawn_verse_cycle_actor(false));
        }

        transition
    }

    fn on_range_ended(&mut self) -> Transition {
        if self.range_cycle_finished() {
            debug!("Range {}-{} finished", self.range.start(), self.range.end());
            let mut transition = self.child.clear();
            self.state = RangeCycleState::Finished;
            transition.push_signal(RepeatSignal::RangeRepeatFinished { range: self.range });
            return transition;
        }

        self.cycles_so_far += 1;
        self.position = 0;
        debug!(
            "Restarting range {}-{} (cycle {}/{})",
            self.range.start(),
            self.range.end(),
            self.cycles_so_far + 1,
            self.settings.range_repeat_count
        );
        self.spawn_verse_cycle_actor(true)
    }

    fn jump_to(&mut self, position: usize) -> Transition {
        self.position = position;
        self.spawn_verse_cycle_actor(true)
    }

    fn update_verse_timings(&mut self, timings: Arc<VerseTimings>) -> Transition {
        let current = self.current_verse();
        let keys = timings.range_keys(&self.range);
        let covers_range = keys.first() == Some(&self.range.start())
            && keys.last() == Some(&self.range.end());

        let position = keys
            .iter()
            .position(|key| *key == current)
            .filter(|_| covers_range);
        let Some(position) = position else {
            warn!(
                "New timings do not cover range {}-{}, keeping previous ones",
                self.range.start(),
                self.range.end()
            );
            return Transition::none();
        };

        // Interior verses may appear or vanish; the cursor stays on the same verse
        self.keys = keys;
        self.position = position;
        self.timings = timings;
        match self.timings.get(&current).cloned() {
            Some(timing) => self
                .child
                .send(VerseCycleEvent::UpdateVerseTiming { timing }),
            None => Transition::none(),
        }
    }
}

impl Actor for RangeCycleActor {
    type Event = RangeCycleEvent;

    fn send(&mut self, event: RangeCycleEvent) -> Transition {
        if self.state != RangeCycleState::InProgress {
            return Transition::none();
        }

        match event {
            RangeCycleEvent::TimestampUpdated { current_time_ms } => {
                self.forward_timestamp_to_verse_actor(current_time_ms)
            }
            RangeCycleEvent::UpdateVerseTimings { timings } => self.update_verse_timings(timings),
            RangeCycleEvent::RepeatNextAyah => {
                let next = (self.position + 1).min(self.keys.len() - 1);
                self.jump_to(next)
            }
            RangeCycleEvent::RepeatPrevAyah => {
                let previous = self.position.saturating_sub(1);
                self.jump_to(previous)
            }
            RangeCycleEvent::RepeatSelectedAyah { verse_key } => {
                if self.selected_ayah_is_not_in_range(&verse_key) {
                    debug!(
                        "Selected verse {} is outside range {}-{}",
                        verse_key,
                        self.range.start(),
                        self.range.end()
                    );
                    return Transition::none();
                }
                match self.keys.iter().position(|key| *key == verse_key) {
                    Some(position) => self.jump_to(position),
                    None => Transition::none(),
                }
            }
            RangeCycleEvent::DelayElapsed { timer } => {
                self.child.send(VerseCycleEvent::DelayElapsed { timer })
            }
        }
    }

    fn stop(&mut self) -> Transition {
        self.state = RangeCycleState::Stopped;
        self.child.clear()
    }

    fn is_finished(&self) -> bool {
        self.state == RangeCycleState::Finished
    }
}

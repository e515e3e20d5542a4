//! Actor contract shared by the repeat state machines
//!
//! Every machine is a state enum plus a transition function that runs to
//! completion and returns what it wants done as a [`Transition`]. Machines
//! never touch the audio device; the controller applies their effects.

use serde::{Deserialize, Serialize};
use tilawa_core::{RepeatRange, VerseKey};

use crate::types::TimerId;

/// Side effect requested by a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Move the playhead
    Seek {
        /// Target position in milliseconds
        time_ms: u64,
    },

    /// Start or resume output
    Play,

    /// Pause output
    Pause,

    /// Arm a one-shot timer; expiry arrives back as `DelayElapsed`
    ScheduleDelay {
        /// Timer to arm
        timer: TimerId,
        /// Delay in milliseconds
        delay_ms: u64,
    },

    /// Disarm a timer armed earlier
    CancelDelay {
        /// Timer to disarm
        timer: TimerId,
    },
}

/// Completion signal bubbling up the actor tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatSignal {
    /// A verse finished all of its repetitions
    VerseRepeatFinished {
        /// Verse that finished
        verse_key: VerseKey,
    },

    /// A range finished all of its cycles
    RangeRepeatFinished {
        /// Range that finished
        range: RepeatRange,
    },

    /// The whole repeat session is over
    RepeatFinished,
}

/// Output of one transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Effects in the order they must be applied
    pub effects: Vec<Effect>,

    /// Signals in the order they were raised
    pub signals: Vec<RepeatSignal>,
}

impl Transition {
    /// Transition with no output
    pub fn none() -> Self {
        Self::default()
    }

    /// Transition carrying a single effect
    pub fn effect(effect: Effect) -> Self {
        Self {
            effects: vec![effect],
            signals: Vec::new(),
        }
    }

    /// Transition carrying a single signal
    pub fn signal(signal: RepeatSignal) -> Self {
        Self {
            effects: Vec::new(),
            signals: vec![signal],
        }
    }

    /// Append an effect
    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Append a signal
    pub fn push_signal(&mut self, signal: RepeatSignal) {
        self.signals.push(signal);
    }

    /// Append everything from `other`, keeping order
    pub fn merge(&mut self, other: Transition) {
        self.effects.extend(other.effects);
        self.signals.extend(other.signals);
    }

    /// Whether nothing was produced
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.signals.is_empty()
    }

    /// Whether any seek was requested
    pub fn seeks(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| matches!(effect, Effect::Seek { .. }))
    }

    pub(crate) fn has_verse_finished(&self) -> bool {
        self.signals
            .iter()
            .any(|signal| matches!(signal, RepeatSignal::VerseRepeatFinished { .. }))
    }

    pub(crate) fn has_range_finished(&self) -> bool {
        self.signals
            .iter()
            .any(|signal| matches!(signal, RepeatSignal::RangeRepeatFinished { .. }))
    }
}

/// Independently lifecycled state machine
///
/// Once `stop` has been called the actor must return empty transitions for
/// every later event; parents rely on this to discard children safely.
pub trait Actor {
    /// Events this actor understands
    type Event;

    /// Run one event to completion
    fn send(&mut self, event: Self::Event) -> Transition;

    /// Stop the actor, returning effects that cancel anything it still owns
    fn stop(&mut self) -> Transition;

    /// Whether the actor reached its final state on its own
    fn is_finished(&self) -> bool;
}

/// Holder for at most one child actor
///
/// Replacing or clearing the slot always stops the previous child first, so a
/// discarded child can never receive another event.
#[derive(Debug)]
pub struct ChildSlot<A: Actor> {
    child: Option<A>,
}

impl<A: Actor> Default for ChildSlot<A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A: Actor> ChildSlot<A> {
    /// Empty slot
    pub fn empty() -> Self {
        Self { child: None }
    }

    /// Install `child`, stopping whatever was there
    pub fn replace(&mut self, child: A) -> Transition {
        let stopped = self.clear();
        self.child = Some(child);
        stopped
    }

    /// Stop and drop the current child
    pub fn clear(&mut self) -> Transition {
        match self.child.take() {
            Some(mut child) => child.stop(),
            None => Transition::none(),
        }
    }

    /// Forward an event to the child, if any
    pub fn send(&mut self, event: A::Event) -> Transition {
        match self.child.as_mut() {
            Some(child) => child.send(event),
            None => Transition::none(),
        }
    }

    /// Current child
    pub fn get(&self) -> Option<&A> {
        self.child.as_ref()
    }

    /// Whether the slot holds a child
    pub fn is_occupied(&self) -> bool {
        self.child.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counted {
        stops: Rc<Cell<u32>>,
        stopped: bool,
    }

    impl Actor for Counted {
        type Event = u64;

        fn send(&mut self, event: u64) -> Transition {
            if self.stopped {
                return Transition::none();
            }
            Transition::effect(Effect::Seek { time_ms: event })
        }

        fn stop(&mut self) -> Transition {
            self.stops.set(self.stops.get() + 1);
            self.stopped = true;
            Transition::effect(Effect::Pause)
        }

        fn is_finished(&self) -> bool {
            false
        }
    }

    fn counted(stops: &Rc<Cell<u32>>) -> Counted {
        Counted {
            stops: Rc::clone(stops),
            stopped: false,
        }
    }

    #[test]
    fn replace_stops_previous_child() {
        let stops = Rc::new(Cell::new(0));
        let mut slot = ChildSlot::empty();

        assert!(slot.replace(counted(&stops)).is_empty());
        assert_eq!(stops.get(), 0);

        let stopped = slot.replace(counted(&stops));
        assert_eq!(stops.get(), 1);
        assert_eq!(stopped.effects, vec![Effect::Pause]);
    }

    #[test]
    fn empty_slot_swallows_events() {
        let mut slot: ChildSlot<Counted> = ChildSlot::empty();
        assert!(slot.send(10).is_empty());
        assert!(slot.clear().is_empty());
    }

    #[test]
    fn clear_empties_slot() {
        let stops = Rc::new(Cell::new(0));
        let mut slot = ChildSlot::empty();
        slot.replace(counted(&stops));

        assert_eq!(slot.send(5).effects, vec![Effect::Seek { time_ms: 5 }]);
        slot.clear();
        assert!(!slot.is_occupied());
        assert!(slot.send(5).is_empty());
        assert_eq!(stops.get(), 1);
    }
}

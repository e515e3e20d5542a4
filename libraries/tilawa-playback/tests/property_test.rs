//! Property-based tests for the repeat machines
//!
//! Uses proptest to verify counting and disposal invariants across many
//! random settings and event sequences.

use std::sync::Arc;

use proptest::prelude::*;
use tilawa_core::{RepeatRange, RepeatSettings, VerseKey, VerseTiming, VerseTimings};
use tilawa_playback::repeat::{
    RangeCycleActor, RangeCycleEvent, RangeCycleState, VerseCycleActor, VerseCycleEvent,
};
use tilawa_playback::{
    Actor, Effect, RepeatEvent, RepeatOrchestrator, RepeatRequest, RepeatSignal, TimerId,
    TimerIds, Transition,
};

// ===== Helpers =====

/// Verses 3:1..=3:n with varying lengths
fn timings(lengths: &[u64]) -> Arc<VerseTimings> {
    let mut from = 0;
    let records = lengths
        .iter()
        .enumerate()
        .map(|(index, length)| {
            let timing = VerseTiming::new(VerseKey::new(3, index as u16 + 1), from, from + length);
            from += length;
            timing
        })
        .collect();
    Arc::new(VerseTimings::new(records).unwrap())
}

fn verse_lengths() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(200u64..5000, 1..8)
}

fn count_seeks(transition: &Transition) -> usize {
    transition
        .effects
        .iter()
        .filter(|effect| matches!(effect, Effect::Seek { .. }))
        .count()
}

fn arbitrary_event() -> impl Strategy<Value = RepeatEvent> {
    prop_oneof![
        (0u64..40_000).prop_map(|current_time_ms| RepeatEvent::TimestampUpdated { current_time_ms }),
        Just(RepeatEvent::RepeatNextAyah),
        Just(RepeatEvent::RepeatPrevAyah),
        (1u16..10).prop_map(|verse| RepeatEvent::RepeatSelectedAyah {
            verse_key: VerseKey::new(3, verse)
        }),
        (1u64..10).prop_map(|id| RepeatEvent::DelayElapsed {
            timer: serde_json::from_str::<TimerId>(&id.to_string()).unwrap()
        }),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: n boundary crossings yield n-1 seeks and one finish
    #[test]
    fn verse_repeats_exactly_as_configured(
        plays in 1u32..20,
        length in 1u64..10_000,
    ) {
        let timing = VerseTiming::new(VerseKey::new(2, 255), 0, length);
        let settings = RepeatSettings::new(plays, 1, 0).unwrap();
        let mut actor = VerseCycleActor::spawn(timing, &settings, TimerIds::new());

        let mut seeks = 0;
        let mut finishes = 0;
        for _ in 0..plays {
            let transition = actor.send(VerseCycleEvent::TimestampUpdated { current_time_ms: length });
            seeks += count_seeks(&transition);
            finishes += transition.signals.len();
        }

        prop_assert_eq!(seeks, plays as usize - 1);
        prop_assert_eq!(finishes, 1);
        prop_assert!(actor.is_finished());

        // Nothing after finishing
        let late = actor.send(VerseCycleEvent::TimestampUpdated { current_time_ms: length });
        prop_assert!(late.is_empty());
    }

    /// Property: k verses * m cycles verse finishes precede one range finish
    #[test]
    fn range_finishes_after_every_verse_of_every_cycle(
        lengths in verse_lengths(),
        plays in 1u32..4,
        cycles in 1u32..4,
    ) {
        let table = timings(&lengths);
        let verse_count = lengths.len() as u16;
        let range = RepeatRange::new(VerseKey::new(3, 1), VerseKey::new(3, verse_count)).unwrap();
        let (mut actor, _) = RangeCycleActor::spawn(
            range,
            RepeatSettings::new(plays, cycles, 0).unwrap(),
            Arc::clone(&table),
            TimerIds::new(),
        )
        .unwrap();

        let mut signals = Vec::new();
        let budget = (verse_count as u32 * plays * cycles) as usize + 1;
        for _ in 0..budget {
            if actor.state() == RangeCycleState::Finished {
                break;
            }
            let end = table.get(&actor.current_verse()).unwrap().timestamp_to;
            signals.extend(actor.send(RangeCycleEvent::TimestampUpdated { current_time_ms: end }).signals);
        }

        prop_assert_eq!(actor.state(), RangeCycleState::Finished);
        prop_assert_eq!(signals.len(), (verse_count as u32 * cycles) as usize + 1);
        prop_assert_eq!(signals.last(), Some(&RepeatSignal::RangeRepeatFinished { range }));
        prop_assert!(signals[..signals.len() - 1]
            .iter()
            .all(|signal| matches!(signal, RepeatSignal::VerseRepeatFinished { .. })),
            "all signals before the last must be VerseRepeatFinished");
    }

    /// Property: a stopped orchestrator never produces anything again
    #[test]
    fn stopped_orchestrator_is_inert(
        lengths in verse_lengths(),
        delay_ms in 0u64..2000,
        before in prop::collection::vec(arbitrary_event(), 0..20),
        after in prop::collection::vec(arbitrary_event(), 1..20),
    ) {
        let table = timings(&lengths);
        let (mut orchestrator, _) = RepeatOrchestrator::spawn(
            RepeatRequest::Ayah { verse_key: VerseKey::new(3, 1) },
            RepeatSettings::new(3, 2, delay_ms).unwrap(),
            table,
            TimerIds::new(),
        )
        .unwrap();

        for event in before {
            orchestrator.send(event);
        }

        let stopped = orchestrator.stop();
        prop_assert!(stopped.signals.is_empty());
        prop_assert!(stopped
            .effects
            .iter()
            .all(|effect| matches!(effect, Effect::CancelDelay { .. })),
            "all effects must be CancelDelay");

        for event in after {
            prop_assert!(orchestrator.send(event).is_empty());
        }
        prop_assert!(orchestrator.stop().is_empty());
    }

    /// Property: every scheduled delay is either fired or cancelled on stop
    #[test]
    fn delays_never_leak(
        length in 100u64..5000,
        ticks in prop::collection::vec(0u64..10_000, 1..30),
    ) {
        let timing = VerseTiming::new(VerseKey::new(1, 1), 0, length);
        let settings = RepeatSettings::new(50, 1, 500).unwrap();
        let mut actor = VerseCycleActor::spawn(timing, &settings, TimerIds::new());

        let mut armed = None;
        for current_time_ms in ticks {
            let transition = actor.send(VerseCycleEvent::TimestampUpdated { current_time_ms });
            for effect in transition.effects {
                if let Effect::ScheduleDelay { timer, .. } = effect {
                    prop_assert!(armed.is_none(), "second delay armed while one is pending");
                    armed = Some(timer);
                }
            }
        }

        let stopped = actor.stop();
        match armed {
            Some(timer) => prop_assert_eq!(stopped.effects, vec![Effect::CancelDelay { timer }]),
            None => prop_assert!(stopped.is_empty()),
        }
    }
}

//! Simulated listening session
//!
//! Wires a [`PlaybackController`] to a [`SimulatedDevice`] and steps the clock,
//! feeding position ticks, timer expiries and end-of-audio back in.

use std::path::Path;
use std::time::Duration;

use tilawa_core::{RepeatRange, RepeatSettings, VerseKey, VerseTimings};
use tilawa_playback::{PlaybackController, PlaybackEvent, PlayerEvent, PlayerState};
use tracing::{debug, info};

use crate::config::{SimConfig, SimulationSettings};
use crate::device::SimulatedDevice;
use crate::error::{Result, SimError};

/// Read a timing table from a JSON file
pub fn load_timings(path: &Path) -> Result<VerseTimings> {
    let json = std::fs::read_to_string(path)?;
    let timings = VerseTimings::from_json(&json)?;
    if timings.is_empty() {
        return Err(SimError::Timings(format!(
            "{} contains no verses",
            path.display()
        )));
    }
    Ok(timings)
}

/// Event observed during a run, stamped with the simulated clock
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TimedEvent {
    /// Simulated time since the run started
    pub at_ms: u64,

    /// What happened
    pub event: PlaybackEvent,
}

/// One controller plus its simulated device
pub struct Simulation {
    controller: PlaybackController,
    device: SimulatedDevice,
    settings: SimulationSettings,
    elapsed_ms: u64,
}

impl Simulation {
    /// Load `timings` into a fresh controller with audio ready to play
    pub fn new(config: &SimConfig, timings: VerseTimings) -> Result<Self> {
        let duration_ms = timings
            .last()
            .map(|timing| timing.timestamp_to)
            .ok_or_else(|| SimError::Timings("no verses to play".to_string()))?;

        let device = SimulatedDevice::new(duration_ms);
        let mut controller =
            PlaybackController::new(Box::new(device.clone()), config.player.clone());

        controller.send(PlayerEvent::AudioDataLoaded)?;
        controller.send(PlayerEvent::UpdateVerseTimings { timings })?;
        controller.send(PlayerEvent::CanPlay)?;

        info!("Simulation ready ({}ms of audio)", duration_ms);
        Ok(Self {
            controller,
            device,
            settings: config.simulation.clone(),
            elapsed_ms: 0,
        })
    }

    /// Start playback, optionally from `verse_key`
    pub fn play(&mut self, verse_key: Option<VerseKey>) -> Result<()> {
        Ok(self.controller.send(PlayerEvent::Play { verse_key })?)
    }

    /// Start repeating `range`
    pub fn repeat(&mut self, range: RepeatRange, settings: RepeatSettings) -> Result<()> {
        let event = if range.len() == 1 {
            PlayerEvent::RepeatAyah {
                verse_key: range.start(),
                settings,
            }
        } else {
            PlayerEvent::RepeatRange { range, settings }
        };
        Ok(self.controller.send(event)?)
    }

    /// Step the clock until playback stops or the time budget runs out
    ///
    /// Returns every outbound event in emission order.
    pub fn run(&mut self) -> Result<Vec<TimedEvent>> {
        let mut events = self.drain();

        while self.controller.state().is_playing_family()
            && self.elapsed_ms < self.settings.max_duration_ms
        {
            self.step()?;
            events.extend(self.drain());

            if self.settings.realtime {
                std::thread::sleep(Duration::from_millis(self.settings.tick_interval_ms));
            }
        }

        debug!(
            "Run stopped after {}ms in {:?}",
            self.elapsed_ms,
            self.controller.state()
        );
        Ok(events)
    }

    fn step(&mut self) -> Result<()> {
        let step = self.device.advance(self.settings.tick_interval_ms);
        self.elapsed_ms += self.settings.tick_interval_ms;

        for timer in step.fired {
            self.controller.send(PlayerEvent::DelayElapsed { timer })?;
        }

        if let Some(current_time_ms) = step.position_ms {
            self.controller
                .send(PlayerEvent::TimestampUpdated { current_time_ms })?;
        }

        if step.ended {
            self.controller.send(PlayerEvent::Ended)?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<TimedEvent> {
        let at_ms = self.elapsed_ms;
        self.controller
            .drain_events()
            .into_iter()
            .map(|event| TimedEvent { at_ms, event })
            .collect()
    }

    /// Controller state
    pub fn state(&self) -> PlayerState {
        self.controller.state()
    }

    /// Simulated time consumed so far
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Playhead position of the device
    pub fn position_ms(&self) -> u64 {
        self.device.position_ms()
    }
}

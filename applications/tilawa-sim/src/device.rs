//! Simulated audio element
//!
//! A playhead that advances only when the simulation clock is stepped, plus a
//! timer list standing in for the platform's delay scheduler.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tilawa_playback::{AudioOutput, PlaybackError, Result, TimerId};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct DeviceState {
    position_ms: u64,
    duration_ms: u64,
    playing: bool,
    timers: Vec<(TimerId, u64)>,
}

/// Outcome of one clock step
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// New playhead position, when the device was playing
    pub position_ms: Option<u64>,

    /// Timers whose delay elapsed during the step
    pub fired: Vec<TimerId>,

    /// Whether the playhead reached the end of the audio
    pub ended: bool,
}

/// Cloneable handle to one simulated device
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDevice {
    /// Create a device for audio of `duration_ms`
    pub fn new(duration_ms: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                duration_ms,
                ..DeviceState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the clock by `step_ms`
    pub fn advance(&self, step_ms: u64) -> Step {
        let mut device = self.lock();

        let mut fired = Vec::new();
        device.timers.retain_mut(|(timer, remaining)| {
            *remaining = remaining.saturating_sub(step_ms);
            if *remaining == 0 {
                fired.push(*timer);
                false
            } else {
                true
            }
        });

        if !device.playing {
            return Step {
                position_ms: None,
                fired,
                ended: false,
            };
        }

        device.position_ms = (device.position_ms + step_ms).min(device.duration_ms);
        let ended = device.position_ms == device.duration_ms;
        if ended {
            device.playing = false;
        }
        trace!("Playhead at {}ms", device.position_ms);

        Step {
            position_ms: Some(device.position_ms),
            fired,
            ended,
        }
    }

    /// Current playhead position
    pub fn position_ms(&self) -> u64 {
        self.lock().position_ms
    }

    /// Whether audio is coming out
    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

impl AudioOutput for SimulatedDevice {
    fn seek(&mut self, position_ms: u64) -> Result<()> {
        let mut device = self.lock();
        if position_ms > device.duration_ms {
            return Err(PlaybackError::Device(format!(
                "seek to {}ms past end of audio ({}ms)",
                position_ms, device.duration_ms
            )));
        }
        debug!("Device seek to {}ms", position_ms);
        device.position_ms = position_ms;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut device = self.lock();
        device.playing = device.position_ms < device.duration_ms;
        debug!("Device play at {}ms", device.position_ms);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut device = self.lock();
        device.playing = false;
        debug!("Device pause at {}ms", device.position_ms);
        Ok(())
    }

    fn schedule_delay(&mut self, timer: TimerId, delay_ms: u64) -> Result<()> {
        debug!("Arming {} for {}ms", timer, delay_ms);
        self.lock().timers.push((timer, delay_ms.max(1)));
        Ok(())
    }

    fn cancel_delay(&mut self, timer: TimerId) {
        debug!("Disarming {}", timer);
        self.lock().timers.retain(|(armed, _)| *armed != timer);
    }
}

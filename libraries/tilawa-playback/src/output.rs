//! Audio device seam
//!
//! The controller is the only component that talks to the device; the repeat
//! machines express their wishes as effects instead.

use crate::error::Result;
use crate::types::TimerId;

/// Platform audio output plus the timer service used for repetition delays
///
/// Implementors translate these calls into real device operations (an HTML
/// audio element, a native player, a test recorder...). Timer expiry must be
/// reported back through `PlayerEvent::DelayElapsed`.
pub trait AudioOutput: Send {
    /// Move the playhead to `position_ms`
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Start or resume output
    fn play(&mut self) -> Result<()>;

    /// Pause output
    fn pause(&mut self) -> Result<()>;

    /// Arm a one-shot timer
    fn schedule_delay(&mut self, timer: TimerId, delay_ms: u64) -> Result<()>;

    /// Disarm a timer; unknown or already-fired timers are ignored
    fn cancel_delay(&mut self, timer: TimerId);
}

/// Device call as seen by [`RecordingOutput`]
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    Seek(u64),
    Play,
    Pause,
    Schedule(TimerId, u64),
    Cancel(TimerId),
}

/// Output that records every call
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    calls: std::sync::Arc<std::sync::Mutex<Vec<DeviceCall>>>,
    fail_next_play: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded calls
    pub fn take(&self) -> Vec<DeviceCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn fail_next_play(&self) {
        self.fail_next_play
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[cfg(test)]
impl AudioOutput for RecordingOutput {
    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.record(DeviceCall::Seek(position_ms));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self
            .fail_next_play
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(crate::error::PlaybackError::Device(
                "output device unplugged".to_string(),
            ));
        }
        self.record(DeviceCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(DeviceCall::Pause);
        Ok(())
    }

    fn schedule_delay(&mut self, timer: TimerId, delay_ms: u64) -> Result<()> {
        self.record(DeviceCall::Schedule(timer, delay_ms));
        Ok(())
    }

    fn cancel_delay(&mut self, timer: TimerId) {
        self.record(DeviceCall::Cancel(timer));
    }
}

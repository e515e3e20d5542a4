//! Playback controller - core orchestration
//!
//! Owns the audio device, the verse timing table and at most one repeat
//! session. Every inbound event runs to completion before `send` returns.

use std::sync::Arc;

use tilawa_core::{RepeatSettings, VerseKey, VerseTimings};
use tracing::{debug, error, info, warn};

use crate::{
    actor::{ChildSlot, Effect, RepeatSignal, Transition},
    error::{PlaybackError, Result},
    events::{PlaybackEvent, PlayerEvent},
    output::AudioOutput,
    repeat::{RepeatEvent, RepeatOrchestrator, RepeatRequest},
    types::{PlayerConfig, PlayerState, TimerId, TimerIds},
};

/// Verse navigation held until the device is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Navigation {
    Next,
    Previous,
}

/// Central playback management
///
/// Orchestrates:
/// - Play/pause/buffering lifecycle against one `AudioOutput`
/// - Start gating on both audio data and verse timings
/// - Verse navigation (queued while the device is not ready)
/// - Repeat sessions, applying their effects to the device
pub struct PlaybackController {
    // State
    state: PlayerState,
    config: PlayerConfig,

    // Device
    output: Box<dyn AudioOutput>,
    audio_loaded: bool,
    device_ready: bool,
    position_ms: u64,

    // Metadata
    timings: Option<Arc<VerseTimings>>,
    current_verse: Option<VerseKey>,

    // Where to start once preparation completes
    target_verse: Option<VerseKey>,
    pending_seek_ms: Option<u64>,
    pending_navigation: Option<Navigation>,

    // Repeat session
    repeat: ChildSlot<RepeatOrchestrator>,
    timers: TimerIds,
    held_by_delay: Option<TimerId>,

    // Event queue for UI synchronization
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackController {
    /// Create a controller driving `output`
    pub fn new(output: Box<dyn AudioOutput>, config: PlayerConfig) -> Self {
        Self {
            state: PlayerState::Idle,
            config,
            output,
            audio_loaded: false,
            device_ready: false,
            position_ms: 0,
            timings: None,
            current_verse: None,
            target_verse: None,
            pending_seek_ms: None,
            pending_navigation: None,
            repeat: ChildSlot::empty(),
            timers: TimerIds::new(),
            held_by_delay: None,
            pending_events: Vec::new(),
        }
    }

    /// Process one event
    ///
    /// Device failures move the controller to `Error` and are returned.
    /// Once the session is over every event is refused.
    pub fn send(&mut self, event: PlayerEvent) -> Result<()> {
        if self.state.is_terminal() {
            return Err(PlaybackError::SessionEnded(self.state));
        }

        match self.handle(event) {
            Err(PlaybackError::Device(message)) => {
                if !self.state.is_terminal() {
                    self.fail(message.clone());
                }
                Err(PlaybackError::Device(message))
            }
            other => other,
        }
    }

    fn handle(&mut self, event: PlayerEvent) -> Result<()> {
        match event {
            PlayerEvent::Play { verse_key } => self.play(verse_key),
            PlayerEvent::RequestPlay => self.resume(),
            PlayerEvent::RequestPause => self.request_pause(),
            PlayerEvent::RequestNextAyah => self.navigate(Navigation::Next),
            PlayerEvent::RequestPreviousAyah => self.navigate(Navigation::Previous),
            PlayerEvent::AudioDataLoaded => {
                self.audio_loaded = true;
                self.device_ready = false;
                self.try_start()
            }
            PlayerEvent::AudioDataCleared => self.clear_audio_data(),
            PlayerEvent::UpdateVerseTimings { timings } => self.update_verse_timings(timings),
            PlayerEvent::CanPlay => self.on_can_play(),
            PlayerEvent::Waiting => {
                if self.state == PlayerState::Playing {
                    self.set_state(PlayerState::Buffering);
                }
                Ok(())
            }
            PlayerEvent::Stalled => {
                if self.state == PlayerState::Buffering {
                    self.set_state(PlayerState::WaitingCanPlay);
                }
                Ok(())
            }
            PlayerEvent::Progress => {
                if self.state == PlayerState::WaitingCanPlay {
                    self.set_state(PlayerState::Buffering);
                }
                Ok(())
            }
            PlayerEvent::Ended => self.on_ended(),
            PlayerEvent::DeviceError { message } => {
                self.fail(message);
                Ok(())
            }
            PlayerEvent::TimestampUpdated { current_time_ms } => self.on_timestamp(current_time_ms),
            PlayerEvent::DelayElapsed { timer } => self
                .forward_to_repeat(RepeatEvent::DelayElapsed { timer })
                .map(drop),
            PlayerEvent::RepeatAyah {
                verse_key,
                settings,
            } => self.start_repeat(RepeatRequest::Ayah { verse_key }, settings),
            PlayerEvent::RepeatRange { range, settings } => {
                self.start_repeat(RepeatRequest::Range { range }, settings)
            }
            PlayerEvent::RepeatSelectedAyah { verse_key } => self
                .forward_to_repeat(RepeatEvent::RepeatSelectedAyah { verse_key })
                .map(drop),
            PlayerEvent::RepeatNextAyah => self
                .forward_to_repeat(RepeatEvent::RepeatNextAyah)
                .map(drop),
            PlayerEvent::RepeatPrevAyah => self
                .forward_to_repeat(RepeatEvent::RepeatPrevAyah)
                .map(drop),
            PlayerEvent::Close => {
                self.close();
                Ok(())
            }
        }
    }

    // ===== Lifecycle =====

    fn play(&mut self, verse_key: Option<VerseKey>) -> Result<()> {
        match self.state {
            PlayerState::Idle | PlayerState::Preparing | PlayerState::WaitingAudioData => {
                if verse_key.is_some() {
                    self.target_verse = verse_key;
                    self.pending_seek_ms = None;
                }
                self.set_state(PlayerState::Preparing);
                self.try_start()
            }
            _ => {
                if let Some(key) = verse_key {
                    if self.repeat.is_occupied() {
                        self.forward_to_repeat(RepeatEvent::RepeatSelectedAyah { verse_key: key })?;
                    }
                    if !self.repeat.is_occupied() {
                        self.seek_to_verse(key)?;
                    }
                }
                self.resume()
            }
        }
    }

    fn resume(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Paused if self.audio_loaded => {
                self.set_state(PlayerState::Playing);
                if let Some(timer) = self.held_by_delay {
                    // The repeat session restarts output once the delay runs out
                    debug!("Resumed during delay {:?}, output stays held", timer);
                    return Ok(());
                }
                self.output.play()
            }
            PlayerState::Paused | PlayerState::Idle => {
                self.set_state(PlayerState::Preparing);
                self.try_start()
            }
            _ => Ok(()),
        }
    }

    fn request_pause(&mut self) -> Result<()> {
        if self.state.is_playing_family() {
            self.set_state(PlayerState::Paused);
            return self.output.pause();
        }
        if matches!(
            self.state,
            PlayerState::Preparing | PlayerState::WaitingAudioData
        ) {
            self.set_state(PlayerState::Paused);
        }
        Ok(())
    }

    /// Leave `Preparing`/`WaitingAudioData` once audio and timings are both present
    fn try_start(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            PlayerState::Preparing | PlayerState::WaitingAudioData
        ) {
            return Ok(());
        }
        if self.no_audio_data() || self.not_enough_data() {
            debug!(
                "Waiting to start (audio: {}, timings: {})",
                self.audio_loaded,
                self.timings.is_some()
            );
            return Ok(());
        }

        let target = self.target_verse.take();
        let start_at = self.pending_seek_ms.take().or_else(|| {
            target.and_then(|key| self.timing_start(&key))
        });

        if let Some(time_ms) = start_at {
            self.output.seek(time_ms)?;
            self.position_ms = time_ms;
            self.refresh_current_verse();
        }

        self.set_state(PlayerState::Playing);
        self.held_by_delay = None;
        self.output.play()
    }

    fn no_audio_data(&self) -> bool {
        !self.audio_loaded
    }

    fn not_enough_data(&self) -> bool {
        match &self.timings {
            None => true,
            Some(timings) => self
                .target_verse
                .is_some_and(|key| !timings.contains(&key)),
        }
    }

    fn audio_player_not_ready(&self) -> bool {
        !self.audio_loaded || !self.device_ready
    }

    fn clear_audio_data(&mut self) -> Result<()> {
        let was_playing = self.state.is_playing_family();

        self.audio_loaded = false;
        self.device_ready = false;
        if self.target_verse.is_none() {
            self.target_verse = self.current_verse;
        }

        if was_playing {
            self.output.pause()?;
            self.set_state(PlayerState::WaitingAudioData);
        }
        Ok(())
    }

    fn on_can_play(&mut self) -> Result<()> {
        self.device_ready = true;
        if matches!(
            self.state,
            PlayerState::Buffering | PlayerState::WaitingCanPlay
        ) {
            self.set_state(PlayerState::Playing);
        }

        match self.pending_navigation.take() {
            Some(navigation) => {
                debug!("Applying queued {:?} navigation", navigation);
                self.navigate(navigation)
            }
            None => Ok(()),
        }
    }

    fn on_ended(&mut self) -> Result<()> {
        if !self.state.is_playing_family() {
            return Ok(());
        }

        if self.repeat.is_occupied() {
            // A verse ending exactly at the end of the file never gets a tick
            // at or past its boundary; the end of audio stands in for one.
            let end_ms = self
                .timings
                .as_ref()
                .and_then(|timings| timings.last())
                .map_or(self.position_ms, |last| last.timestamp_to)
                .max(self.position_ms);

            let transition =
                self.forward_to_repeat(RepeatEvent::TimestampUpdated { current_time_ms: end_ms })?;
            if self.repeat.is_occupied() {
                if transition.seeks() && self.state.is_playing_family() {
                    self.output.play()?;
                }
                return Ok(());
            }
        }

        self.set_state(PlayerState::Paused);
        Ok(())
    }

    fn close(&mut self) {
        info!("Closing playback session");
        let transition = self.repeat.clear();
        self.set_state(PlayerState::Closed);

        for effect in transition.effects {
            if let Effect::CancelDelay { timer } = effect {
                self.output.cancel_delay(timer);
            }
        }
        self.held_by_delay = None;
        self.pending_navigation = None;

        if self.audio_loaded {
            if let Err(err) = self.output.pause() {
                warn!("Failed to pause output while closing: {}", err);
            }
        }
    }

    fn fail(&mut self, message: String) {
        error!("Playback failed: {}", message);
        let transition = self.repeat.clear();
        self.set_state(PlayerState::Error);

        for effect in transition.effects {
            if let Effect::CancelDelay { timer } = effect {
                self.output.cancel_delay(timer);
            }
        }
        self.held_by_delay = None;
        self.pending_navigation = None;
        self.pending_events.push(PlaybackEvent::Error { message });
    }

    // ===== Position and metadata =====

    fn on_timestamp(&mut self, current_time_ms: u64) -> Result<()> {
        self.position_ms = current_time_ms;
        self.refresh_current_verse();

        if matches!(
            self.state,
            PlayerState::Idle | PlayerState::Preparing | PlayerState::WaitingAudioData
        ) {
            return Ok(());
        }

        self.forward_to_repeat(RepeatEvent::TimestampUpdated { current_time_ms })
            .map(drop)
    }

    fn update_verse_timings(&mut self, timings: VerseTimings) -> Result<()> {
        info!("Verse timings updated ({} verses)", timings.len());
        let timings = Arc::new(timings);
        self.timings = Some(Arc::clone(&timings));
        self.refresh_current_verse();

        self.forward_to_repeat(RepeatEvent::UpdateVerseTimings { timings })?;
        self.try_start()
    }

    fn refresh_current_verse(&mut self) {
        let verse_key = self
            .timings
            .as_ref()
            .and_then(|timings| timings.verse_at(self.position_ms))
            .map(|timing| timing.verse_key);

        if verse_key != self.current_verse {
            self.current_verse = verse_key;
            self.pending_events
                .push(PlaybackEvent::VerseChanged { verse_key });
        }
    }

    fn timing_start(&self, key: &VerseKey) -> Option<u64> {
        self.timings
            .as_ref()?
            .get(key)
            .map(|timing| timing.timestamp_from)
    }

    fn seek_to_verse(&mut self, key: VerseKey) -> Result<()> {
        match self.timing_start(&key) {
            Some(time_ms) => self.apply_effect(Effect::Seek { time_ms }),
            None => {
                debug!("No timing for {}, ignoring", key);
                Ok(())
            }
        }
    }

    // ===== Navigation =====

    fn navigate(&mut self, navigation: Navigation) -> Result<()> {
        if self.state == PlayerState::Idle {
            return Ok(());
        }

        if self.repeat.is_occupied() {
            let event = match navigation {
                Navigation::Next => RepeatEvent::RepeatNextAyah,
                Navigation::Previous => RepeatEvent::RepeatPrevAyah,
            };
            return self.forward_to_repeat(event).map(drop);
        }

        if self.audio_player_not_ready() {
            if self.config.queue_navigation_until_ready {
                debug!("Device not ready, queueing {:?}", navigation);
                self.pending_navigation = Some(navigation);
            } else {
                debug!("Device not ready, dropping {:?}", navigation);
            }
            return Ok(());
        }

        let Some(target) = self.adjacent_verse(navigation) else {
            debug!("No verse to move to ({:?})", navigation);
            return Ok(());
        };

        debug!("Moving to verse {}", target);
        self.target_verse = Some(target);
        self.pending_seek_ms = None;
        self.set_state(PlayerState::Preparing);
        self.try_start()
    }

    fn adjacent_verse(&self, navigation: Navigation) -> Option<VerseKey> {
        let timings = self.timings.as_ref()?;

        match (navigation, self.current_verse) {
            (Navigation::Next, Some(key)) => timings.next_key(&key),
            (Navigation::Previous, Some(key)) => timings.previous_key(&key),
            (Navigation::Next, None) => timings
                .iter()
                .find(|timing| timing.timestamp_from >= self.position_ms)
                .map(|timing| timing.verse_key),
            (Navigation::Previous, None) => timings
                .iter()
                .rev()
                .find(|timing| timing.timestamp_to <= self.position_ms)
                .map(|timing| timing.verse_key),
        }
    }

    // ===== Repeat =====

    fn start_repeat(&mut self, request: RepeatRequest, settings: RepeatSettings) -> Result<()> {
        settings
            .validate()
            .map_err(|err| PlaybackError::InvalidRequest(err.to_string()))?;

        let Some(timings) = self.timings.clone() else {
            debug!("Repeat requested before verse timings arrived, ignoring");
            return Ok(());
        };

        let same_settings = self
            .repeat
            .get()
            .is_some_and(|orchestrator| orchestrator.settings() == settings);
        if same_settings {
            self.forward_to_repeat(RepeatEvent::Repeat { request })?;
        } else {
            let Some((orchestrator, spawned)) =
                RepeatOrchestrator::spawn(request, settings, timings, self.timers.clone())
            else {
                debug!("Repeat target has no timings, ignoring");
                return Ok(());
            };

            let mut transition = self.repeat.replace(orchestrator);
            transition.merge(spawned);
            self.apply_transition(&transition)?;
        }

        match self.state {
            PlayerState::Idle => {
                self.set_state(PlayerState::Preparing);
                self.try_start()
            }
            PlayerState::Paused => self.resume(),
            _ => Ok(()),
        }
    }

    fn forward_to_repeat(&mut self, event: RepeatEvent) -> Result<Transition> {
        let transition = self.repeat.send(event);
        self.apply_transition(&transition)?;
        Ok(transition)
    }

    fn apply_transition(&mut self, transition: &Transition) -> Result<()> {
        for effect in &transition.effects {
            self.apply_effect(*effect)?;
        }

        let mut finished = false;
        for signal in &transition.signals {
            finished |= *signal == RepeatSignal::RepeatFinished;
            self.pending_events.push(signal.clone().into());
        }

        if finished {
            // Finished orchestrators own nothing, so clearing yields no effects
            let released = self.repeat.clear();
            for effect in released.effects {
                self.apply_effect(effect)?;
            }
        }
        Ok(())
    }

    fn apply_effect(&mut self, effect: Effect) -> Result<()> {
        match effect {
            Effect::Seek { time_ms } => {
                if self.audio_loaded {
                    self.output.seek(time_ms)?;
                    self.position_ms = time_ms;
                    self.refresh_current_verse();
                } else {
                    self.pending_seek_ms = Some(time_ms);
                }
                Ok(())
            }
            Effect::Play => {
                self.held_by_delay = None;
                if self.state.is_playing_family() {
                    self.output.play()?;
                }
                Ok(())
            }
            Effect::Pause => {
                if self.audio_loaded {
                    self.output.pause()?;
                }
                Ok(())
            }
            Effect::ScheduleDelay { timer, delay_ms } => {
                self.held_by_delay = Some(timer);
                self.output.schedule_delay(timer, delay_ms)
            }
            Effect::CancelDelay { timer } => {
                self.output.cancel_delay(timer);
                if self.held_by_delay == Some(timer) {
                    self.held_by_delay = None;
                    if self.config.resume_after_cancelled_delay
                        && self.state.is_playing_family()
                    {
                        self.output.play()?;
                    }
                }
                Ok(())
            }
        }
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            debug!("Player state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.pending_events.push(PlaybackEvent::StateChanged { state });
        }
    }

    // ===== State Queries =====

    /// Current state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Last known playhead position in milliseconds
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Verse under the playhead
    pub fn current_verse(&self) -> Option<VerseKey> {
        self.current_verse
    }

    /// Whether a repeat session is active
    pub fn is_repeating(&self) -> bool {
        self.repeat.is_occupied()
    }

    /// Active repeat session
    pub fn repeat_session(&self) -> Option<&RepeatOrchestrator> {
        self.repeat.get()
    }

    // ===== Events =====

    /// Take all queued outbound events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{DeviceCall, RecordingOutput};
    use tilawa_core::{RepeatRange, VerseTiming};

    fn key(verse: u16) -> VerseKey {
        VerseKey::new(2, verse)
    }

    /// Verses 2:1..=2:5, each 1000ms long
    fn timings() -> VerseTimings {
        VerseTimings::new(
            (1..=5)
                .map(|v: u16| {
                    let from = u64::from(v - 1) * 1000;
                    VerseTiming::new(key(v), from, from + 1000)
                })
                .collect(),
        )
        .unwrap()
    }

    fn controller() -> (PlaybackController, RecordingOutput) {
        let output = RecordingOutput::new();
        let controller =
            PlaybackController::new(Box::new(output.clone()), PlayerConfig::default());
        (controller, output)
    }

    /// Controller playing from 2:1 with a ready device
    fn playing() -> (PlaybackController, RecordingOutput) {
        let (mut controller, output) = controller();
        controller.send(PlayerEvent::AudioDataLoaded).unwrap();
        controller
            .send(PlayerEvent::UpdateVerseTimings { timings: timings() })
            .unwrap();
        controller.send(PlayerEvent::Play { verse_key: Some(key(1)) }).unwrap();
        controller.send(PlayerEvent::CanPlay).unwrap();
        output.take();
        controller.drain_events();
        (controller, output)
    }

    fn tick(current_time_ms: u64) -> PlayerEvent {
        PlayerEvent::TimestampUpdated { current_time_ms }
    }

    #[test]
    fn starts_only_when_audio_and_timings_are_present() {
        let (mut controller, output) = controller();

        controller.send(PlayerEvent::Play { verse_key: Some(key(3)) }).unwrap();
        assert_eq!(controller.state(), PlayerState::Preparing);

        controller.send(PlayerEvent::AudioDataLoaded).unwrap();
        assert_eq!(controller.state(), PlayerState::Preparing);
        assert!(output.take().is_empty());

        controller
            .send(PlayerEvent::UpdateVerseTimings { timings: timings() })
            .unwrap();
        assert_eq!(controller.state(), PlayerState::Playing);
        assert_eq!(output.take(), vec![DeviceCall::Seek(2000), DeviceCall::Play]);
    }

    #[test]
    fn timings_first_then_audio_also_starts() {
        let (mut controller, output) = controller();
        controller
            .send(PlayerEvent::UpdateVerseTimings { timings: timings() })
            .unwrap();
        controller.send(PlayerEvent::Play { verse_key: None }).unwrap();
        assert_eq!(controller.state(), PlayerState::Preparing);

        controller.send(PlayerEvent::AudioDataLoaded).unwrap();
        assert_eq!(controller.state(), PlayerState::Playing);
        assert_eq!(output.take(), vec![DeviceCall::Play]);
    }

    #[test]
    fn pause_and_resume() {
        let (mut controller, output) = playing();

        controller.send(PlayerEvent::RequestPause).unwrap();
        assert_eq!(controller.state(), PlayerState::Paused);

        controller.send(PlayerEvent::RequestPlay).unwrap();
        assert_eq!(controller.state(), PlayerState::Playing);
        assert_eq!(output.take(), vec![DeviceCall::Pause, DeviceCall::Play]);
    }

    #[test]
    fn buffering_cycle() {
        let (mut controller, _) = playing();

        controller.send(PlayerEvent::Waiting).unwrap();
        assert_eq!(controller.state(), PlayerState::Buffering);
        controller.send(PlayerEvent::Stalled).unwrap();
        assert_eq!(controller.state(), PlayerState::WaitingCanPlay);
        controller.send(PlayerEvent::Progress).unwrap();
        assert_eq!(controller.state(), PlayerState::Buffering);
        controller.send(PlayerEvent::CanPlay).unwrap();
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[test]
    fn next_ayah_seeks_to_following_verse() {
        let (mut controller, output) = playing();
        controller.send(tick(1500)).unwrap();
        assert_eq!(controller.current_verse(), Some(key(2)));

        controller.send(PlayerEvent::RequestNextAyah).unwrap();
        assert_eq!(output.take(), vec![DeviceCall::Seek(2000), DeviceCall::Play]);
        assert_eq!(controller.state(), PlayerState::Playing);

        controller.send(tick(2000)).unwrap();
        controller.send(PlayerEvent::RequestPreviousAyah).unwrap();
        assert_eq!(output.take(), vec![DeviceCall::Seek(1000), DeviceCall::Play]);
    }

    #[test]
    fn consecutive_next_requests_advance_one_verse_each() {
        let (mut controller, output) = playing();
        controller.send(tick(500)).unwrap();

        controller.send(PlayerEvent::RequestNextAyah).unwrap();
        controller.send(PlayerEvent::RequestNextAyah).unwrap();
        assert_eq!(
            output.take(),
            vec![
                DeviceCall::Seek(1000),
                DeviceCall::Play,
                DeviceCall::Seek(2000),
                DeviceCall::Play
            ]
        );
        assert_eq!(controller.current_verse(), Some(key(3)));
        assert!(controller.drain_events().contains(&PlaybackEvent::VerseChanged {
            verse_key: Some(key(3))
        }));
    }

    #[test]
    fn navigation_is_queued_until_device_can_play() {
        let (mut controller, output) = controller();
        controller.send(PlayerEvent::AudioDataLoaded).unwrap();
        controller
            .send(PlayerEvent::UpdateVerseTimings { timings: timings() })
            .unwrap();
        controller.send(PlayerEvent::Play { verse_key: Some(key(1)) }).unwrap();
        output.take();

        controller.send(PlayerEvent::RequestNextAyah).unwrap();
        assert!(output.take().is_empty());

        controller.send(PlayerEvent::CanPlay).unwrap();
        assert_eq!(output.take(), vec![DeviceCall::Seek(1000), DeviceCall::Play]);
    }

    #[test]
    fn navigation_dropped_when_queueing_disabled() {
        let output = RecordingOutput::new();
        let mut controller = PlaybackController::new(
            Box::new(output.clone()),
            PlayerConfig {
                queue_navigation_until_ready: false,
                ..PlayerConfig::default()
            },
        );
        controller.send(PlayerEvent::AudioDataLoaded).unwrap();
        controller
            .send(PlayerEvent::UpdateVerseTimings { timings: timings() })
            .unwrap();
        controller.send(PlayerEvent::Play { verse_key: Some(key(1)) }).unwrap();
        output.take();

        controller.send(PlayerEvent::RequestNextAyah).unwrap();
        controller.send(PlayerEvent::CanPlay).unwrap();
        assert!(output.take().is_empty());
    }

    #[test]
    fn device_error_is_terminal() {
        let (mut controller, _) = playing();
        controller
            .send(PlayerEvent::DeviceError {
                message: "decode failure".to_string(),
            })
            .unwrap();

        assert_eq!(controller.state(), PlayerState::Error);
        assert!(controller.drain_events().contains(&PlaybackEvent::Error {
            message: "decode failure".to_string()
        }));
        assert!(matches!(
            controller.send(PlayerEvent::RequestPlay),
            Err(PlaybackError::SessionEnded(PlayerState::Error))
        ));
    }

    #[test]
    fn failing_device_call_moves_to_error() {
        let (mut controller, output) = playing();
        controller.send(PlayerEvent::RequestPause).unwrap();
        output.fail_next_play();

        let result = controller.send(PlayerEvent::RequestPlay);
        assert!(matches!(result, Err(PlaybackError::Device(_))));
        assert_eq!(controller.state(), PlayerState::Error);
    }

    #[test]
    fn close_tears_down_repeat_and_pending_delay() {
        let (mut controller, output) = playing();
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(1),
                settings: RepeatSettings::new(3, 1, 2000).unwrap(),
            })
            .unwrap();
        controller.send(tick(1000)).unwrap();
        let timer = output
            .take()
            .into_iter()
            .find_map(|call| match call {
                DeviceCall::Schedule(timer, _) => Some(timer),
                _ => None,
            })
            .unwrap();

        controller.send(PlayerEvent::Close).unwrap();
        assert_eq!(controller.state(), PlayerState::Closed);
        assert!(!controller.is_repeating());
        assert_eq!(output.take(), vec![DeviceCall::Cancel(timer), DeviceCall::Pause]);

        assert!(controller.send(PlayerEvent::DelayElapsed { timer }).is_err());
    }

    #[test]
    fn repeat_request_without_timing_is_ignored() {
        let (mut controller, output) = playing();
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(99),
                settings: RepeatSettings::default(),
            })
            .unwrap();
        assert!(!controller.is_repeating());
        assert!(output.take().is_empty());
    }

    #[test]
    fn repeat_request_with_zero_count_is_refused() {
        let (mut controller, _) = playing();
        let result = controller.send(PlayerEvent::RepeatAyah {
            verse_key: key(1),
            settings: RepeatSettings {
                verses_repeat_count: 0,
                range_repeat_count: 1,
                delay_between_repetitions_ms: 0,
            },
        });
        assert!(matches!(result, Err(PlaybackError::InvalidRequest(_))));
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[test]
    fn repeat_from_idle_starts_playback_at_verse() {
        let (mut controller, output) = controller();
        controller
            .send(PlayerEvent::UpdateVerseTimings { timings: timings() })
            .unwrap();
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(4),
                settings: RepeatSettings::new(2, 1, 0).unwrap(),
            })
            .unwrap();
        assert_eq!(controller.state(), PlayerState::Preparing);

        controller.send(PlayerEvent::AudioDataLoaded).unwrap();
        assert_eq!(controller.state(), PlayerState::Playing);
        assert_eq!(output.take(), vec![DeviceCall::Seek(3000), DeviceCall::Play]);
    }

    #[test]
    fn repeat_finishes_and_releases_controller() {
        let (mut controller, output) = playing();
        controller
            .send(PlayerEvent::RepeatRange {
                range: RepeatRange::new(key(1), key(2)).unwrap(),
                settings: RepeatSettings::new(1, 1, 0).unwrap(),
            })
            .unwrap();
        assert_eq!(output.take(), vec![DeviceCall::Seek(0)]);

        controller.send(tick(1000)).unwrap();
        controller.send(tick(2000)).unwrap();

        assert!(!controller.is_repeating());
        let events = controller.drain_events();
        assert!(events.contains(&PlaybackEvent::RepeatFinished));

        // Playback carries on normally
        controller.send(tick(3000)).unwrap();
        assert!(output.take().is_empty());
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[test]
    fn cancelled_delay_resumes_output() {
        let (mut controller, output) = playing();
        let settings = RepeatSettings::new(2, 1, 1500).unwrap();
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(1),
                settings,
            })
            .unwrap();
        controller.send(tick(1000)).unwrap();
        let calls = output.take();
        let timer = calls
            .iter()
            .find_map(|call| match call {
                DeviceCall::Schedule(timer, 1500) => Some(*timer),
                _ => None,
            })
            .unwrap();

        // Different settings replace the session while the output is held
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(3),
                settings: RepeatSettings::default(),
            })
            .unwrap();
        assert_eq!(
            output.take(),
            vec![
                DeviceCall::Cancel(timer),
                DeviceCall::Play,
                DeviceCall::Seek(2000)
            ]
        );
    }

    #[test]
    fn delay_elapsing_while_paused_does_not_resume() {
        let (mut controller, output) = playing();
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(1),
                settings: RepeatSettings::new(2, 1, 1500).unwrap(),
            })
            .unwrap();
        controller.send(tick(1000)).unwrap();
        let timer = output
            .take()
            .into_iter()
            .find_map(|call| match call {
                DeviceCall::Schedule(timer, _) => Some(timer),
                _ => None,
            })
            .unwrap();

        controller.send(PlayerEvent::RequestPause).unwrap();
        controller.send(PlayerEvent::DelayElapsed { timer }).unwrap();
        assert_eq!(output.take(), vec![DeviceCall::Pause, DeviceCall::Seek(0)]);
        assert_eq!(controller.state(), PlayerState::Paused);
    }

    #[test]
    fn resume_during_delay_waits_for_the_delay() {
        let (mut controller, output) = playing();
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(1),
                settings: RepeatSettings::new(2, 1, 1500).unwrap(),
            })
            .unwrap();
        controller.send(tick(1000)).unwrap();
        let timer = output
            .take()
            .into_iter()
            .find_map(|call| match call {
                DeviceCall::Schedule(timer, _) => Some(timer),
                _ => None,
            })
            .unwrap();

        controller.send(PlayerEvent::RequestPause).unwrap();
        controller.send(PlayerEvent::RequestPlay).unwrap();
        assert_eq!(controller.state(), PlayerState::Playing);
        assert_eq!(output.take(), vec![DeviceCall::Pause]);

        controller.send(PlayerEvent::DelayElapsed { timer }).unwrap();
        assert_eq!(output.take(), vec![DeviceCall::Seek(0), DeviceCall::Play]);
    }

    #[test]
    fn ended_with_repeat_restarts_last_verse() {
        let (mut controller, output) = playing();
        controller
            .send(PlayerEvent::RepeatAyah {
                verse_key: key(5),
                settings: RepeatSettings::new(2, 1, 0).unwrap(),
            })
            .unwrap();
        output.take();

        controller.send(tick(4990)).unwrap();
        controller.send(PlayerEvent::Ended).unwrap();
        assert_eq!(output.take(), vec![DeviceCall::Seek(4000), DeviceCall::Play]);
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[test]
    fn ended_without_repeat_pauses() {
        let (mut controller, _) = playing();
        controller.send(PlayerEvent::Ended).unwrap();
        assert_eq!(controller.state(), PlayerState::Paused);
    }

    #[test]
    fn audio_swap_waits_for_new_data_then_resumes_current_verse() {
        let (mut controller, output) = playing();
        controller.send(tick(2500)).unwrap();

        controller.send(PlayerEvent::AudioDataCleared).unwrap();
        assert_eq!(controller.state(), PlayerState::WaitingAudioData);

        controller.send(PlayerEvent::AudioDataLoaded).unwrap();
        assert_eq!(controller.state(), PlayerState::Playing);
        assert_eq!(
            output.take(),
            vec![DeviceCall::Pause, DeviceCall::Seek(2000), DeviceCall::Play]
        );
    }

    #[test]
    fn verse_changes_are_reported() {
        let (mut controller, _) = playing();
        controller.send(tick(500)).unwrap();
        controller.send(tick(1200)).unwrap();
        let changes: Vec<_> = controller
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, PlaybackEvent::VerseChanged { .. }))
            .collect();
        assert_eq!(
            changes,
            vec![PlaybackEvent::VerseChanged {
                verse_key: Some(key(2))
            }]
        );
    }
}

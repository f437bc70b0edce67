// Speech utterance driver
// Narrates the full poem as one utterance and keys effects to its progress

use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::effects::EffectBank;
use super::triggers::TriggerSet;
use super::{select_voice, SpeechEngine, SpeechEvent, UtteranceId, UtteranceRequest};
use crate::audio::{AudioClip, AudioEvent};
use crate::error::SpeechError;
use crate::playback::state::{PlaybackObserver, PlaybackState};
use crate::playback::timer::{Scheduler, TimerKind, TimerToken};

pub const EFFECT_DRAMATIC: &str = "dramatic";
pub const EFFECT_LAUGH: &str = "laugh";

/// Voice selection and the fixed delivery parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechPreset {
    pub lang_prefix: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeechPreset {
    fn default() -> Self {
        Self {
            lang_prefix: "es".to_string(),
            rate: 0.9,
            pitch: 0.8,
            volume: 1.0,
        }
    }
}

struct ReplayTimer<G> {
    token: TimerToken,
    _guard: G,
}

pub struct SpeechDriver<E: SpeechEngine, C: AudioClip, S: Scheduler> {
    engine: E,
    effects: EffectBank<C>,
    triggers: TriggerSet,
    scheduler: S,
    preset: SpeechPreset,
    replay_delay: Duration,
    text: String,
    state: PlaybackState,
    next_utterance: u64,
    active: Option<UtteranceId>,
    generation: u64,
    replay: Option<ReplayTimer<S::Guard>>,
    observer: Option<Box<dyn PlaybackObserver>>,
}

impl<E: SpeechEngine, C: AudioClip, S: Scheduler> SpeechDriver<E, C, S> {
    pub fn new(
        engine: E,
        effects: EffectBank<C>,
        triggers: TriggerSet,
        scheduler: S,
        text: String,
    ) -> Self {
        Self {
            engine,
            effects,
            triggers,
            scheduler,
            preset: SpeechPreset::default(),
            replay_delay: Duration::from_millis(150),
            text,
            state: PlaybackState::Idle,
            next_utterance: 0,
            active: None,
            generation: 0,
            replay: None,
            observer: None,
        }
    }

    pub fn with_preset(mut self, preset: SpeechPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_replay_delay(mut self, delay: Duration) -> Self {
        self.replay_delay = delay;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn PlaybackObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_utterance(&self) -> Option<UtteranceId> {
        self.active
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    /// Start narrating from the beginning, replacing any utterance in flight
    pub fn play(&mut self) -> Result<(), SpeechError> {
        if !self.engine.is_available() {
            warn!("speech synthesis unavailable, refusing to play");
            return Err(SpeechError::Unavailable);
        }

        self.replay = None;
        self.engine.cancel();
        self.active = None;

        let voice = select_voice(&self.engine.voices(), &self.preset.lang_prefix);
        match &voice {
            Some(v) => debug!(voice = %v.name, lang = %v.lang, "selected narration voice"),
            None => debug!(lang = %self.preset.lang_prefix, "no matching voice, using engine default"),
        }

        self.next_utterance += 1;
        let id = UtteranceId(self.next_utterance);
        self.triggers.arm(&self.text);
        self.engine.speak(UtteranceRequest {
            id,
            text: self.text.clone(),
            voice,
            rate: self.preset.rate,
            pitch: self.preset.pitch,
            volume: self.preset.volume,
        });
        self.active = Some(id);
        info!(utterance = id.0, "narration requested");
        Ok(())
    }

    /// No-op unless the engine is currently speaking
    pub fn pause(&mut self) {
        if self.active.is_some() && self.engine.is_speaking() && !self.engine.is_paused() {
            self.engine.pause();
            self.set_state(PlaybackState::Paused);
        }
    }

    /// No-op unless the engine is paused
    pub fn resume(&mut self) {
        if self.active.is_some() && self.engine.is_paused() {
            self.engine.resume();
            self.set_state(PlaybackState::Playing);
        }
    }

    pub fn stop(&mut self) {
        self.replay = None;
        self.engine.cancel();
        self.active = None;
        self.generation += 1;
        self.set_state(PlaybackState::Idle);
    }

    /// Stop now, start again once the cancellation has settled
    pub fn replay(&mut self) {
        self.stop();
        let token = TimerToken::new(TimerKind::Replay, self.generation);
        self.replay = Some(ReplayTimer {
            token,
            _guard: self.scheduler.schedule(token, self.replay_delay),
        });
    }

    pub fn handle_timer(&mut self, token: TimerToken) {
        match &self.replay {
            Some(pending) if pending.token == token => {}
            _ => {
                trace!(?token, "ignoring stale replay timer");
                return;
            }
        }
        self.replay = None;
        if let Err(e) = self.play() {
            warn!(error = %e, "deferred replay failed");
        }
    }

    pub fn handle_speech_event(&mut self, event: SpeechEvent) {
        if self.active != Some(event.utterance()) {
            trace!(?event, "ignoring event for inactive utterance");
            return;
        }

        match event {
            SpeechEvent::Start { .. } => {
                // A pause issued before the engine got going still holds
                if !self.engine.is_paused() {
                    self.set_state(PlaybackState::Playing);
                }
                self.effects.play(EFFECT_DRAMATIC);
            }
            SpeechEvent::End { .. } => {
                self.active = None;
                self.set_state(PlaybackState::Ended);
                self.effects.play(EFFECT_LAUGH);
            }
            SpeechEvent::Error { message, .. } => {
                warn!(%message, "narration failed");
                self.active = None;
                self.set_state(PlaybackState::Idle);
            }
            SpeechEvent::Boundary {
                char_index,
                char_length,
                ..
            } => {
                for effect in self.triggers.advance(char_index.saturating_add(char_length)) {
                    debug!(%effect, "narration reached trigger phrase");
                    self.effects.play(&effect);
                }
            }
        }
    }

    pub fn handle_audio_event(&self, event: &AudioEvent) {
        self.effects.handle_audio_event(event);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        self.state = state;
        if let Some(observer) = &self.observer {
            observer.state_changed(state);
        }
    }
}

impl<E: SpeechEngine, C: AudioClip, S: Scheduler> Drop for SpeechDriver<E, C, S> {
    fn drop(&mut self) {
        if self.active.is_some() {
            self.engine.cancel();
        }
    }
}

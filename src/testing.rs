// Recording fakes for the host services, used by unit tests
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::{AudioClip, AudioHost, ClipId};
use crate::playback::state::{PlaybackObserver, PlaybackState};
use crate::playback::timer::{Scheduler, TimerToken};
use crate::speech::{SpeechEngine, UtteranceRequest, Voice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Open(ClipId, PathBuf),
    Play(ClipId),
    Pause(ClipId),
    Resume(ClipId),
    Rewind(ClipId),
    Release(ClipId),
}

#[derive(Clone, Default)]
pub struct FakeAudioHost {
    pub calls: Arc<Mutex<Vec<HostCall>>>,
}

impl FakeAudioHost {
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<(ClipId, PathBuf)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Open(id, path) => Some((id, path)),
                _ => None,
            })
            .collect()
    }

    pub fn last_opened(&self) -> ClipId {
        self.opened().last().map(|(id, _)| *id).expect("no clip opened")
    }

    pub fn count(&self, wanted: impl Fn(&HostCall) -> bool) -> usize {
        self.calls().iter().filter(|c| wanted(c)).count()
    }
}

pub struct FakeClip {
    id: ClipId,
    calls: Arc<Mutex<Vec<HostCall>>>,
    playing: bool,
    paused: bool,
}

impl AudioHost for FakeAudioHost {
    type Clip = FakeClip;

    fn open(&self, id: ClipId, path: &Path) -> FakeClip {
        self.calls.lock().unwrap().push(HostCall::Open(id, path.to_path_buf()));
        FakeClip {
            id,
            calls: self.calls.clone(),
            playing: false,
            paused: false,
        }
    }
}

impl AudioClip for FakeClip {
    fn id(&self) -> ClipId {
        self.id
    }

    fn play(&mut self) {
        self.calls.lock().unwrap().push(HostCall::Play(self.id));
        self.playing = true;
        self.paused = false;
    }

    fn pause(&mut self) -> bool {
        self.calls.lock().unwrap().push(HostCall::Pause(self.id));
        if self.playing && !self.paused {
            self.paused = true;
            true
        } else {
            false
        }
    }

    fn resume(&mut self) -> bool {
        self.calls.lock().unwrap().push(HostCall::Resume(self.id));
        if self.paused {
            self.paused = false;
            true
        } else {
            false
        }
    }

    fn rewind(&mut self) {
        self.calls.lock().unwrap().push(HostCall::Rewind(self.id));
    }
}

impl Drop for FakeClip {
    fn drop(&mut self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(HostCall::Release(self.id));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCall {
    Schedule(TimerToken, Duration),
    Cancel(TimerToken),
}

#[derive(Clone, Default)]
pub struct FakeScheduler {
    pub calls: Arc<Mutex<Vec<TimerCall>>>,
}

impl FakeScheduler {
    pub fn calls(&self) -> Vec<TimerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_scheduled(&self) -> (TimerToken, Duration) {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|c| match c {
                TimerCall::Schedule(token, delay) => Some((token, delay)),
                _ => None,
            })
            .expect("nothing scheduled")
    }

    /// Timers scheduled and not cancelled yet
    pub fn pending(&self) -> Vec<TimerToken> {
        let mut pending = Vec::new();
        for call in self.calls() {
            match call {
                TimerCall::Schedule(token, _) => pending.push(token),
                TimerCall::Cancel(token) => pending.retain(|t| *t != token),
            }
        }
        pending
    }
}

pub struct FakeTimer {
    token: TimerToken,
    calls: Arc<Mutex<Vec<TimerCall>>>,
}

impl Drop for FakeTimer {
    fn drop(&mut self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(TimerCall::Cancel(self.token));
        }
    }
}

impl Scheduler for FakeScheduler {
    type Guard = FakeTimer;

    fn schedule(&self, token: TimerToken, delay: Duration) -> FakeTimer {
        self.calls.lock().unwrap().push(TimerCall::Schedule(token, delay));
        FakeTimer {
            token,
            calls: self.calls.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    State(PlaybackState),
    Stanza(usize),
}

#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub seen: Arc<Mutex<Vec<Transition>>>,
}

impl RecordingObserver {
    pub fn seen(&self) -> Vec<Transition> {
        self.seen.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<PlaybackState> {
        self.seen()
            .into_iter()
            .filter_map(|t| match t {
                Transition::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn stanzas(&self) -> Vec<usize> {
        self.seen()
            .into_iter()
            .filter_map(|t| match t {
                Transition::Stanza(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

impl PlaybackObserver for RecordingObserver {
    fn state_changed(&self, state: PlaybackState) {
        self.seen.lock().unwrap().push(Transition::State(state));
    }

    fn stanza_changed(&self, index: usize) {
        self.seen.lock().unwrap().push(Transition::Stanza(index));
    }
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub available: bool,
    pub voices: Vec<Voice>,
    pub spoken: Vec<UtteranceRequest>,
    pub cancels: usize,
    pub pauses: usize,
    pub resumes: usize,
    pub speaking: bool,
    pub paused: bool,
}

#[derive(Clone)]
pub struct FakeSpeechEngine {
    pub log: Arc<Mutex<EngineLog>>,
}

impl FakeSpeechEngine {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self {
            log: Arc::new(Mutex::new(EngineLog {
                available: true,
                voices,
                ..Default::default()
            })),
        }
    }

    pub fn unavailable() -> Self {
        let engine = Self::new(Vec::new());
        engine.log.lock().unwrap().available = false;
        engine
    }

    pub fn set_speaking(&self, speaking: bool) {
        self.log.lock().unwrap().speaking = speaking;
    }

    pub fn spoken(&self) -> Vec<UtteranceRequest> {
        self.log.lock().unwrap().spoken.clone()
    }

    pub fn cancels(&self) -> usize {
        self.log.lock().unwrap().cancels
    }
}

impl SpeechEngine for FakeSpeechEngine {
    fn is_available(&self) -> bool {
        self.log.lock().unwrap().available
    }

    fn voices(&self) -> Vec<Voice> {
        self.log.lock().unwrap().voices.clone()
    }

    fn speak(&mut self, request: UtteranceRequest) {
        let mut log = self.log.lock().unwrap();
        log.spoken.push(request);
        log.speaking = true;
        log.paused = false;
    }

    fn cancel(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.cancels += 1;
        log.speaking = false;
        log.paused = false;
    }

    fn pause(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.pauses += 1;
        log.paused = true;
    }

    fn resume(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.resumes += 1;
        log.paused = false;
    }

    fn is_speaking(&self) -> bool {
        self.log.lock().unwrap().speaking
    }

    fn is_paused(&self) -> bool {
        self.log.lock().unwrap().paused
    }
}

pub fn voice(name: &str, lang: &str, default: bool) -> Voice {
    Voice {
        name: name.to_string(),
        lang: lang.to_string(),
        default,
    }
}

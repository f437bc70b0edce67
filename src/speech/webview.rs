// Speech engine backed by the webview's speech synthesis
// Requests go out as events; the page reports capabilities and utterance
// progress back through commands.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Runtime};
use tracing::{debug, warn};

use super::{SpeechEngine, SpeechEvent, UtteranceId, UtteranceRequest, Voice};

#[derive(Debug, Default)]
struct BridgeState {
    available: bool,
    voices: Vec<Voice>,
    /// Utterance last handed to the page; events for any other are stale
    current: Option<UtteranceId>,
    speaking: bool,
    paused: bool,
}

/// What the page has told us about its synthesizer
#[derive(Clone, Default)]
pub struct SpeechBridge {
    inner: Arc<Mutex<BridgeState>>,
}

impl SpeechBridge {
    pub fn set_capabilities(&self, available: bool, voices: Vec<Voice>) {
        let mut state = self.inner.lock();
        debug!(available, voices = voices.len(), "speech capabilities reported");
        state.available = available;
        state.voices = voices;
    }

    /// Track speaking/paused from the page's own notifications
    pub fn observe(&self, event: &SpeechEvent) {
        let mut state = self.inner.lock();
        if state.current != Some(event.utterance()) {
            debug!(?event, "ignoring page event for a replaced utterance");
            return;
        }
        match event {
            SpeechEvent::Start { .. } => state.speaking = true,
            SpeechEvent::End { .. } | SpeechEvent::Error { .. } => {
                state.current = None;
                state.speaking = false;
                state.paused = false;
            }
            SpeechEvent::Boundary { .. } => {}
        }
    }

    fn begin(&self, utterance: UtteranceId) {
        let mut state = self.inner.lock();
        state.current = Some(utterance);
        state.speaking = true;
        state.paused = false;
    }

    fn halt(&self) {
        let mut state = self.inner.lock();
        state.current = None;
        state.speaking = false;
        state.paused = false;
    }

    pub fn is_available(&self) -> bool {
        self.inner.lock().available
    }
}

#[derive(Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum SpeechCommand {
    Speak(UtteranceRequest),
    Cancel,
    Pause,
    Resume,
}

pub struct WebviewSpeech<R: Runtime> {
    app: AppHandle<R>,
    bridge: SpeechBridge,
}

impl<R: Runtime> WebviewSpeech<R> {
    pub fn new(app: AppHandle<R>, bridge: SpeechBridge) -> Self {
        Self { app, bridge }
    }

    fn send(&self, command: SpeechCommand) {
        if let Err(e) = self.app.emit("speech://command", command) {
            warn!(error = %e, "failed to reach the speech bridge");
        }
    }
}

impl<R: Runtime> SpeechEngine for WebviewSpeech<R> {
    fn is_available(&self) -> bool {
        self.bridge.is_available()
    }

    fn voices(&self) -> Vec<Voice> {
        self.bridge.inner.lock().voices.clone()
    }

    fn speak(&mut self, request: UtteranceRequest) {
        self.bridge.begin(request.id);
        self.send(SpeechCommand::Speak(request));
    }

    fn cancel(&mut self) {
        self.bridge.halt();
        self.send(SpeechCommand::Cancel);
    }

    fn pause(&mut self) {
        self.bridge.inner.lock().paused = true;
        self.send(SpeechCommand::Pause);
    }

    fn resume(&mut self) {
        self.bridge.inner.lock().paused = false;
        self.send(SpeechCommand::Resume);
    }

    fn is_speaking(&self) -> bool {
        self.bridge.inner.lock().speaking
    }

    fn is_paused(&self) -> bool {
        self.bridge.inner.lock().paused
    }
}

// Playback session
// A single task owns both drivers; commands, media events, speech events and
// timer expiries are all handled one at a time on that task.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::sequencer::StanzaSequencer;
use super::state::{LoggingObserver, PlaybackState};
use super::timer::{TimerKind, TimerToken, TokioScheduler};
use crate::audio::{AudioEvent, AudioHost, ClipOwner};
use crate::error::SessionError;
use crate::poem::Poem;
use crate::settings::{AppSettings, Surface};
use crate::speech::{EffectBank, SpeechDriver, SpeechEngine, SpeechEvent, TriggerSet};
use crate::view::{self, ViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Resume,
    Stop,
    Replay,
    ToggleShowAll,
    /// Switch drivers; whatever was playing is stopped
    SetSurface(Surface),
    Snapshot,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub surface: Surface,
    pub state: PlaybackState,
    pub index: usize,
    pub show_all: bool,
    pub speech_available: bool,
    pub view: ViewModel,
}

/// Receives every distinct snapshot the session produces
pub trait SessionObserver: Send {
    fn snapshot_changed(&self, snapshot: &SessionSnapshot);
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
}

/// Cheap, cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::UnboundedSender<Request>,
    speech_events: mpsc::UnboundedSender<SpeechEvent>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<SessionSnapshot, SessionError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn play(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Stop).await
    }

    pub async fn replay(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Replay).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Snapshot).await
    }

    /// Stop both drivers and end the session task
    pub async fn shutdown(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Shutdown).await
    }

    /// Forward a notification from the speech engine
    pub fn speech_event(&self, event: SpeechEvent) -> Result<(), SessionError> {
        self.speech_events.send(event).map_err(|_| SessionError::Closed)
    }
}

pub struct Session<H: AudioHost, E: SpeechEngine> {
    poem: Poem,
    surface: Surface,
    show_all: bool,
    sequencer: StanzaSequencer<H, TokioScheduler>,
    speech: SpeechDriver<E, H::Clip, TokioScheduler>,
    observer: Option<Box<dyn SessionObserver>>,
    last: Option<SessionSnapshot>,
}

impl<H, E> Session<H, E>
where
    H: AudioHost + Send + 'static,
    E: SpeechEngine + 'static,
{
    /// Build both drivers and start the session task. Asset paths in
    /// `settings` are used as given.
    pub fn spawn(
        poem: Poem,
        settings: &AppSettings,
        host: H,
        engine: E,
        audio_events: mpsc::UnboundedReceiver<AudioEvent>,
        observer: Option<Box<dyn SessionObserver>>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(timer_tx);

        let effects = EffectBank::preload(&host, &settings.assets.effect_paths());
        let speech = SpeechDriver::new(
            engine,
            effects,
            TriggerSet::new(settings.speech.triggers.clone()),
            scheduler.clone(),
            poem.narration_text(),
        )
        .with_preset(settings.speech.preset())
        .with_replay_delay(settings.timing.replay_delay())
        .with_observer(Box::new(LoggingObserver::new("narration")));

        let sequencer = StanzaSequencer::new(
            host,
            scheduler,
            settings.assets.stanza_assets(),
            poem.len(),
            settings.timing.sequencer(),
        )
        .with_observer(Box::new(LoggingObserver::new("stanzas")));

        let session = Session {
            poem,
            surface: settings.interface.surface,
            show_all: settings.interface.show_all,
            sequencer,
            speech,
            observer,
            last: None,
        };

        let task = tokio::spawn(session.run(request_rx, audio_events, speech_rx, timer_rx));
        let handle = SessionHandle {
            requests: request_tx,
            speech_events: speech_tx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut audio_events: mpsc::UnboundedReceiver<AudioEvent>,
        mut speech_events: mpsc::UnboundedReceiver<SpeechEvent>,
        mut timers: mpsc::UnboundedReceiver<TimerToken>,
    ) {
        info!(stanzas = self.poem.len(), surface = ?self.surface, "playback session started");
        self.publish();

        loop {
            // Pending notifications are drained before the next command
            tokio::select! {
                biased;
                Some(event) = audio_events.recv() => self.route_audio(event),
                Some(event) = speech_events.recv() => self.speech.handle_speech_event(event),
                Some(token) = timers.recv() => self.route_timer(token),
                request = requests.recv() => {
                    let Some(Request { command, reply }) = request else {
                        break;
                    };
                    let result = self.apply(command);
                    let _ = reply.send(result);
                    if command == Command::Shutdown {
                        break;
                    }
                }
            }
            self.publish();
        }

        // Dropping the drivers releases clips, timers and any utterance
        info!("playback session stopped");
    }

    fn apply(&mut self, command: Command) -> Result<SessionSnapshot, SessionError> {
        debug!(?command, surface = ?self.surface, "session command");
        match (command, self.surface) {
            (Command::Play, Surface::Stanzas) => self.sequencer.play(),
            (Command::Play, Surface::Narration) => self.speech.play()?,
            (Command::Pause, Surface::Stanzas) => self.sequencer.pause(),
            (Command::Pause, Surface::Narration) => self.speech.pause(),
            (Command::Resume, Surface::Stanzas) => self.sequencer.resume(),
            (Command::Resume, Surface::Narration) => self.speech.resume(),
            (Command::Stop, Surface::Stanzas) => self.sequencer.stop(),
            (Command::Stop, Surface::Narration) => self.speech.stop(),
            (Command::Replay, Surface::Stanzas) => self.sequencer.replay(),
            (Command::Replay, Surface::Narration) => self.speech.replay(),
            (Command::ToggleShowAll, _) => self.show_all = !self.show_all,
            (Command::SetSurface(surface), current) => {
                if surface != current {
                    self.sequencer.stop();
                    self.speech.stop();
                    self.surface = surface;
                }
            }
            (Command::Snapshot, _) => {}
            (Command::Shutdown, _) => {
                self.sequencer.stop();
                self.speech.stop();
            }
        }
        Ok(self.snapshot())
    }

    fn route_audio(&mut self, event: AudioEvent) {
        match event.clip.owner {
            ClipOwner::Stanza => self.sequencer.handle_audio_event(event),
            ClipOwner::Effect => self.speech.handle_audio_event(&event),
        }
    }

    fn route_timer(&mut self, token: TimerToken) {
        match token.kind {
            TimerKind::Probe | TimerKind::Fallback => self.sequencer.handle_timer(token),
            TimerKind::Replay => self.speech.handle_timer(token),
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let (state, index) = match self.surface {
            Surface::Stanzas => (self.sequencer.state(), self.sequencer.index()),
            Surface::Narration => (self.speech.state(), 0),
        };
        SessionSnapshot {
            surface: self.surface,
            state,
            index,
            show_all: self.show_all,
            speech_available: self.speech.is_available(),
            view: view::render(&self.poem, self.surface, state, index, self.show_all),
        }
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        if self.last.as_ref() == Some(&snapshot) {
            return;
        }
        if let Some(observer) = &self.observer {
            observer.snapshot_changed(&snapshot);
        }
        self.last = Some(snapshot);
    }
}

// Stanza audio sequencer
// Plays one clip per stanza and advances on end, failure or timeout

use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::audio::{AudioClip, AudioEvent, AudioEventKind, AudioHost, ClipId};
use crate::playback::state::{PlaybackObserver, PlaybackState};
use crate::playback::timer::{Scheduler, TimerKind, TimerToken};
use crate::poem::StanzaAssets;

/// How long to wait for a load signal, and how long to linger on a stanza
/// whose clip cannot play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerTiming {
    pub probe: Duration,
    pub fallback: Duration,
}

impl Default for SequencerTiming {
    fn default() -> Self {
        Self {
            probe: Duration::from_millis(500),
            fallback: Duration::from_millis(10_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipPhase {
    /// Opened, waiting for ready or failure
    Loading,
    /// `play` requested, waiting for the start signal
    Starting,
    Playing,
    /// Reached its end while paused; resume moves on to the next stanza
    Finished,
    /// Waiting out the fallback delay
    Failed,
}

struct ActiveClip<C> {
    clip: C,
    phase: ClipPhase,
}

struct PendingTimer<G> {
    token: TimerToken,
    _guard: G,
}

pub struct StanzaSequencer<H: AudioHost, S: Scheduler> {
    host: H,
    scheduler: S,
    assets: StanzaAssets,
    stanza_count: usize,
    timing: SequencerTiming,
    state: PlaybackState,
    index: usize,
    generation: u64,
    active: Option<ActiveClip<H::Clip>>,
    timer: Option<PendingTimer<S::Guard>>,
    observer: Option<Box<dyn PlaybackObserver>>,
}

impl<H: AudioHost, S: Scheduler> StanzaSequencer<H, S> {
    pub fn new(
        host: H,
        scheduler: S,
        assets: StanzaAssets,
        stanza_count: usize,
        timing: SequencerTiming,
    ) -> Self {
        Self {
            host,
            scheduler,
            assets,
            stanza_count,
            timing,
            state: PlaybackState::Idle,
            index: 0,
            generation: 0,
            active: None,
            timer: None,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn PlaybackObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Idle => {
                self.set_state(PlaybackState::Playing);
                self.enter_stanza(self.index);
            }
            PlaybackState::Paused => self.resume(),
            PlaybackState::Playing => {}
            PlaybackState::Ended => self.replay(),
        }
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        self.timer = None;
        if let Some(active) = self.active.as_mut() {
            let frozen = active.clip.pause();
            trace!(stanza = self.index, frozen, "paused clip");
        }
        self.set_state(PlaybackState::Paused);
    }

    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }

        self.set_state(PlaybackState::Playing);
        if self.active.as_ref().map(|a| a.phase) == Some(ClipPhase::Finished) {
            self.enter_stanza(self.index + 1);
            return;
        }
        let continued = match self.active.as_mut() {
            Some(active) if active.phase == ClipPhase::Playing => active.clip.resume(),
            _ => false,
        };
        if !continued {
            debug!(stanza = self.index, "clip not resumable, restarting stanza");
            self.enter_stanza(self.index);
        }
    }

    /// Safe from any state. Anything scheduled for the old clip is ignored
    /// afterwards.
    pub fn stop(&mut self) {
        self.release();
        self.generation += 1;
        self.index = 0;
        self.set_state(PlaybackState::Idle);
    }

    pub fn replay(&mut self) {
        self.stop();
        self.play();
    }

    pub fn handle_audio_event(&mut self, event: AudioEvent) {
        if !self.state.is_active() {
            trace!(?event, state = ?self.state, "ignoring audio event while not playing");
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.clip.id() != event.clip {
            trace!(?event, "ignoring stale audio event");
            return;
        }

        if self.state == PlaybackState::Paused {
            // Only terminal outcomes are kept; resume acts on them
            match (active.phase, event.kind) {
                (ClipPhase::Starting | ClipPhase::Playing, AudioEventKind::Ended) => {
                    debug!(stanza = self.index, "stanza clip ended while paused");
                    active.phase = ClipPhase::Finished;
                }
                (ClipPhase::Loading | ClipPhase::Starting | ClipPhase::Playing, AudioEventKind::Failed(reason)) => {
                    warn!(stanza = self.index, %reason, "stanza clip failed while paused");
                    active.phase = ClipPhase::Failed;
                }
                (_, kind) => trace!(?kind, "ignoring audio event while paused"),
            }
            return;
        }

        match (active.phase, event.kind) {
            (ClipPhase::Loading, AudioEventKind::Ready) => {
                self.timer = None;
                active.phase = ClipPhase::Starting;
                active.clip.play();
            }
            (ClipPhase::Starting, AudioEventKind::Started) => {
                active.phase = ClipPhase::Playing;
                debug!(stanza = self.index, "stanza clip playing");
            }
            (ClipPhase::Starting, AudioEventKind::PlayRejected(reason)) => {
                warn!(stanza = self.index, %reason, "stanza clip refused to start");
                active.phase = ClipPhase::Failed;
                self.arm(TimerKind::Fallback, self.timing.fallback);
            }
            (ClipPhase::Loading | ClipPhase::Starting | ClipPhase::Playing, AudioEventKind::Failed(reason)) => {
                warn!(stanza = self.index, %reason, "stanza clip failed");
                active.phase = ClipPhase::Failed;
                self.arm(TimerKind::Fallback, self.timing.fallback);
            }
            (ClipPhase::Starting | ClipPhase::Playing, AudioEventKind::Ended) => {
                self.enter_stanza(self.index + 1);
            }
            (phase, kind) => {
                trace!(?phase, ?kind, "audio event does not apply");
            }
        }
    }

    pub fn handle_timer(&mut self, token: TimerToken) {
        match &self.timer {
            Some(pending) if pending.token == token => {}
            _ => {
                trace!(?token, "ignoring stale timer");
                return;
            }
        }
        self.timer = None;

        match token.kind {
            TimerKind::Probe => {
                warn!(
                    stanza = self.index,
                    after = ?self.timing.probe,
                    "no load signal for stanza clip, treating as missing"
                );
                if let Some(active) = self.active.as_mut() {
                    active.phase = ClipPhase::Failed;
                }
                self.arm(TimerKind::Fallback, self.timing.fallback);
            }
            TimerKind::Fallback => {
                debug!(stanza = self.index, "fallback elapsed, advancing");
                self.enter_stanza(self.index + 1);
            }
            TimerKind::Replay => {}
        }
    }

    fn enter_stanza(&mut self, index: usize) {
        self.release();
        self.generation += 1;
        self.index = index;

        if index >= self.stanza_count {
            self.set_state(PlaybackState::Ended);
            return;
        }

        if let Some(observer) = &self.observer {
            observer.stanza_changed(index);
        }

        let path = self.assets.path(index);
        debug!(stanza = index, path = %path.display(), "opening stanza clip");
        let clip = self.host.open(ClipId::stanza(self.generation), &path);
        self.active = Some(ActiveClip {
            clip,
            phase: ClipPhase::Loading,
        });
        self.arm(TimerKind::Probe, self.timing.probe);
    }

    fn arm(&mut self, kind: TimerKind, delay: Duration) {
        let token = TimerToken::new(kind, self.generation);
        // Replacing the slot drops (and cancels) any previous timer
        self.timer = Some(PendingTimer {
            token,
            _guard: self.scheduler.schedule(token, delay),
        });
    }

    fn release(&mut self) {
        self.timer = None;
        self.active = None;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeAudioHost, FakeScheduler, HostCall, RecordingObserver, TimerCall, Transition,
    };
    use std::path::PathBuf;

    struct Rig {
        host: FakeAudioHost,
        timers: FakeScheduler,
        observer: RecordingObserver,
        seq: StanzaSequencer<FakeAudioHost, FakeScheduler>,
    }

    fn rig(stanzas: usize) -> Rig {
        let host = FakeAudioHost::default();
        let timers = FakeScheduler::default();
        let observer = RecordingObserver::default();
        let seq = StanzaSequencer::new(
            host.clone(),
            timers.clone(),
            StanzaAssets::new("/audio", "stanza", "wav"),
            stanzas,
            SequencerTiming::default(),
        )
        .with_observer(Box::new(observer.clone()));
        Rig {
            host,
            timers,
            observer,
            seq,
        }
    }

    impl Rig {
        fn current(&self) -> ClipId {
            self.host.last_opened()
        }

        fn send(&mut self, kind: AudioEventKind) {
            let clip = self.current();
            self.seq.handle_audio_event(AudioEvent::new(clip, kind));
        }

        fn play_through_current(&mut self) {
            self.send(AudioEventKind::Ready);
            self.send(AudioEventKind::Started);
            self.send(AudioEventKind::Ended);
        }

        fn fire_last_timer(&mut self) {
            let (token, _) = self.timers.last_scheduled();
            self.seq.handle_timer(token);
        }
    }

    #[test]
    fn test_natural_playback_visits_every_stanza_once() {
        for n in 0..5 {
            let mut r = rig(n);
            r.seq.play();
            for _ in 0..n {
                r.play_through_current();
            }
            assert_eq!(r.seq.state(), PlaybackState::Ended);
            assert_eq!(r.observer.stanzas(), (0..n).collect::<Vec<_>>());
            assert_eq!(
                r.observer.states(),
                vec![PlaybackState::Playing, PlaybackState::Ended]
            );
            let paths: Vec<PathBuf> = r.host.opened().into_iter().map(|(_, p)| p).collect();
            let expected: Vec<PathBuf> = (1..=n)
                .map(|i| PathBuf::from(format!("/audio/stanza{}.wav", i)))
                .collect();
            assert_eq!(paths, expected);
        }
    }

    #[test]
    fn test_empty_poem_ends_immediately() {
        let mut r = rig(0);
        r.seq.play();
        assert_eq!(r.seq.state(), PlaybackState::Ended);
        assert!(r.host.opened().is_empty());
        assert!(r.timers.pending().is_empty());
    }

    #[test]
    fn test_ready_cancels_probe_and_plays() {
        let mut r = rig(2);
        r.seq.play();
        let (token, delay) = r.timers.last_scheduled();
        assert_eq!(token.kind, TimerKind::Probe);
        assert_eq!(delay, Duration::from_millis(500));

        r.send(AudioEventKind::Ready);
        assert!(r.timers.pending().is_empty());
        let clip = r.current();
        assert!(r.host.calls().contains(&HostCall::Play(clip)));
    }

    #[test]
    fn test_load_failure_arms_fallback_then_advances() {
        let mut r = rig(2);
        r.seq.play();
        r.send(AudioEventKind::Failed("missing".into()));

        let (token, delay) = r.timers.last_scheduled();
        assert_eq!(token.kind, TimerKind::Fallback);
        assert_eq!(delay, Duration::from_secs(10));
        assert_eq!(r.seq.index(), 0);

        r.fire_last_timer();
        assert_eq!(r.seq.index(), 1);
        assert_eq!(r.seq.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_play_rejected_arms_fallback() {
        let mut r = rig(1);
        r.seq.play();
        r.send(AudioEventKind::Ready);
        r.send(AudioEventKind::PlayRejected("autoplay".into()));

        let (token, _) = r.timers.last_scheduled();
        assert_eq!(token.kind, TimerKind::Fallback);
        r.fire_last_timer();
        assert_eq!(r.seq.state(), PlaybackState::Ended);
    }

    #[test]
    fn test_probe_expiry_treated_as_missing() {
        let mut r = rig(2);
        r.seq.play();
        r.fire_last_timer();

        let (token, _) = r.timers.last_scheduled();
        assert_eq!(token.kind, TimerKind::Fallback);

        // A late ready signal must not start the stalled clip
        let stalled = r.current();
        r.send(AudioEventKind::Ready);
        assert!(!r.host.calls().contains(&HostCall::Play(stalled)));

        r.fire_last_timer();
        assert_eq!(r.seq.index(), 1);
    }

    #[test]
    fn test_only_one_path_advances() {
        let mut r = rig(3);
        r.seq.play();
        r.send(AudioEventKind::Ready);
        r.send(AudioEventKind::Started);
        let first = r.current();
        r.send(AudioEventKind::Ended);
        assert_eq!(r.seq.index(), 1);

        // Duplicate end and an old probe token both belong to the first clip
        r.seq.handle_audio_event(AudioEvent::new(first, AudioEventKind::Ended));
        r.seq.handle_timer(TimerToken::new(TimerKind::Probe, first.serial));
        r.seq.handle_timer(TimerToken::new(TimerKind::Fallback, first.serial));
        assert_eq!(r.seq.index(), 1);
        assert_eq!(r.observer.stanzas(), vec![0, 1]);
    }

    #[test]
    fn test_new_stanza_releases_previous_clip_and_timer() {
        let mut r = rig(2);
        r.seq.play();
        let first = r.current();
        r.send(AudioEventKind::Failed("gone".into()));
        r.fire_last_timer();

        assert!(r.host.calls().contains(&HostCall::Release(first)));
        assert_eq!(r.timers.pending().len(), 1);
    }

    #[test]
    fn test_stop_from_any_state_blocks_stale_callbacks() {
        let mut r = rig(3);
        r.seq.play();
        r.play_through_current();
        r.send(AudioEventKind::Ready);
        r.send(AudioEventKind::Started);
        let live = r.current();
        let (armed, _) = r.timers.last_scheduled();

        r.seq.stop();
        assert_eq!(r.seq.state(), PlaybackState::Idle);
        assert_eq!(r.seq.index(), 0);
        assert!(r.timers.pending().is_empty());
        assert!(r.host.calls().contains(&HostCall::Release(live)));

        r.observer.clear();
        r.seq.handle_audio_event(AudioEvent::new(live, AudioEventKind::Ended));
        r.seq.handle_timer(armed);
        assert!(r.observer.seen().is_empty());

        // Stopping again, or from idle, is harmless
        r.seq.stop();
        assert_eq!(r.seq.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stale_callbacks_ignored_after_quick_restart() {
        let mut r = rig(2);
        r.seq.play();
        let old = r.current();
        r.seq.stop();
        r.seq.play();

        r.seq.handle_audio_event(AudioEvent::new(old, AudioEventKind::Failed("late".into())));
        assert!(r.timers.pending().iter().all(|t| t.kind == TimerKind::Probe));
        assert_eq!(r.seq.index(), 0);
    }

    #[test]
    fn test_pause_resume_keeps_index() {
        let mut r = rig(3);
        r.seq.play();
        r.play_through_current();
        r.send(AudioEventKind::Ready);
        r.send(AudioEventKind::Started);
        let clip = r.current();

        r.seq.pause();
        assert_eq!(r.seq.state(), PlaybackState::Paused);
        assert!(r.host.calls().contains(&HostCall::Pause(clip)));

        r.seq.resume();
        assert_eq!(r.seq.state(), PlaybackState::Playing);
        assert_eq!(r.seq.index(), 1);
        assert_eq!(r.current(), clip, "the retained clip continues");
        assert!(r.host.calls().contains(&HostCall::Resume(clip)));

        r.send(AudioEventKind::Ended);
        assert_eq!(r.observer.stanzas(), vec![0, 1, 2]);
    }

    #[test]
    fn test_pause_cancels_fallback_and_resume_restarts_stanza() {
        let mut r = rig(2);
        r.seq.play();
        r.send(AudioEventKind::Failed("missing".into()));
        assert_eq!(r.timers.pending().len(), 1);

        r.seq.pause();
        assert!(r.timers.pending().is_empty());

        r.seq.resume();
        assert_eq!(r.seq.index(), 0);
        assert_eq!(r.host.opened().len(), 2);
        assert_eq!(r.timers.last_scheduled().0.kind, TimerKind::Probe);
    }

    #[test]
    fn test_events_ignored_while_paused() {
        let mut r = rig(2);
        r.seq.play();
        r.seq.pause();
        r.send(AudioEventKind::Ready);
        assert_eq!(r.host.count(|c| matches!(c, HostCall::Play(_))), 0);
        assert_eq!(r.seq.index(), 0);
    }

    #[test]
    fn test_end_while_paused_advances_on_resume() {
        let mut r = rig(3);
        r.seq.play();
        r.send(AudioEventKind::Ready);
        r.send(AudioEventKind::Started);
        let first = r.current();

        r.seq.pause();
        r.send(AudioEventKind::Ended);
        assert_eq!(r.seq.state(), PlaybackState::Paused);
        assert_eq!(r.seq.index(), 0);

        r.seq.resume();
        assert_eq!(r.seq.state(), PlaybackState::Playing);
        assert_eq!(r.seq.index(), 1);
        assert!(!r.host.calls().contains(&HostCall::Resume(first)));
        assert!(r.host.calls().contains(&HostCall::Release(first)));
        assert_eq!(r.host.opened().len(), 2);
        assert_eq!(r.observer.stanzas(), vec![0, 1]);
    }

    #[test]
    fn test_failure_while_paused_retries_on_resume() {
        let mut r = rig(2);
        r.seq.play();
        r.send(AudioEventKind::Ready);
        r.send(AudioEventKind::Started);

        r.seq.pause();
        r.send(AudioEventKind::Failed("device lost".into()));
        r.seq.resume();

        assert_eq!(r.seq.index(), 0);
        assert_eq!(r.host.opened().len(), 2);
        assert_eq!(r.timers.last_scheduled().0.kind, TimerKind::Probe);
    }

    #[test]
    fn test_play_while_playing_is_noop() {
        let mut r = rig(2);
        r.seq.play();
        r.seq.play();
        assert_eq!(r.host.opened().len(), 1);
    }

    #[test]
    fn test_two_stanza_scenario_with_missing_second_asset() {
        let mut r = rig(2);
        r.seq.play();
        r.play_through_current();
        r.send(AudioEventKind::Failed("not found".into()));
        let (token, delay) = r.timers.last_scheduled();
        assert_eq!((token.kind, delay), (TimerKind::Fallback, Duration::from_secs(10)));
        r.seq.handle_timer(token);

        assert_eq!(
            r.observer.seen(),
            vec![
                Transition::State(PlaybackState::Playing),
                Transition::Stanza(0),
                Transition::Stanza(1),
                Transition::State(PlaybackState::Ended),
            ]
        );
    }

    #[test]
    fn test_replay_reproduces_traversal() {
        let mut r = rig(3);
        r.seq.play();
        for _ in 0..3 {
            r.play_through_current();
        }
        let first_pass = r.observer.stanzas();
        r.observer.clear();

        r.seq.replay();
        for _ in 0..3 {
            r.play_through_current();
        }
        assert_eq!(r.observer.stanzas(), first_pass);
        assert_eq!(
            r.observer.states(),
            vec![PlaybackState::Idle, PlaybackState::Playing, PlaybackState::Ended]
        );
    }

    #[test]
    fn test_play_from_ended_replays() {
        let mut r = rig(1);
        r.seq.play();
        r.play_through_current();
        r.seq.play();
        assert_eq!(r.seq.state(), PlaybackState::Playing);
        assert_eq!(r.seq.index(), 0);
    }

    #[test]
    fn test_drop_releases_clip_and_timer() {
        let r = rig(2);
        let Rig { host, timers, mut seq, .. } = r;
        seq.play();
        let clip = host.last_opened();
        drop(seq);

        assert!(host.calls().contains(&HostCall::Release(clip)));
        assert!(timers
            .calls()
            .iter()
            .any(|c| matches!(c, TimerCall::Cancel(t) if t.kind == TimerKind::Probe)));
    }
}

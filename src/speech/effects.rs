// Named sound effects played alongside narration
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::audio::{AudioClip, AudioEvent, AudioEventKind, AudioHost, ClipId};

/// Effect clips, opened once and replayed from the start on demand
pub struct EffectBank<C: AudioClip> {
    clips: HashMap<String, C>,
}

impl<C: AudioClip> EffectBank<C> {
    /// Open every effect up front so triggering one never waits on a load
    pub fn preload<H>(host: &H, effects: &[(String, PathBuf)]) -> Self
    where
        H: AudioHost<Clip = C>,
    {
        let clips = effects
            .iter()
            .enumerate()
            .map(|(serial, (name, path))| {
                debug!(effect = %name, path = %path.display(), "preloading effect");
                (name.clone(), host.open(ClipId::effect(serial as u64), path))
            })
            .collect();
        Self { clips }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    /// Fire and forget; failures only show up in the log
    pub fn play(&mut self, name: &str) {
        match self.clips.get_mut(name) {
            Some(clip) => {
                clip.rewind();
                clip.play();
            }
            None => debug!(effect = %name, "no such effect"),
        }
    }

    pub fn handle_audio_event(&self, event: &AudioEvent) {
        let Some(name) = self
            .clips
            .iter()
            .find(|(_, clip)| clip.id() == event.clip)
            .map(|(name, _)| name)
        else {
            return;
        };

        match &event.kind {
            AudioEventKind::Failed(reason) | AudioEventKind::PlayRejected(reason) => {
                warn!(effect = %name, %reason, "sound effect failed");
            }
            _ => {}
        }
    }
}

//! Speech narration
//!
//! The host supplies a [`SpeechEngine`]; the [`SpeechDriver`] narrates the
//! whole poem as a single utterance and keys sound effects to phrases as the
//! engine reports word boundaries.

pub mod driver;
pub mod effects;
pub mod triggers;
#[cfg(feature = "desktop")]
pub mod webview;

use serde::{Deserialize, Serialize};

pub use driver::{SpeechDriver, SpeechPreset};
pub use effects::EffectBank;
pub use triggers::{Trigger, TriggerSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 tag as reported by the engine, e.g. `es-MX`
    pub lang: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceRequest {
    pub id: UtteranceId,
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Lifecycle and progress notifications from the engine
///
/// Boundary offsets are in UTF-16 code units, the unit webview engines use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpeechEvent {
    Start {
        utterance: UtteranceId,
    },
    End {
        utterance: UtteranceId,
    },
    Error {
        utterance: UtteranceId,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Boundary {
        utterance: UtteranceId,
        char_index: usize,
        #[serde(default)]
        char_length: usize,
    },
}

impl SpeechEvent {
    pub fn utterance(&self) -> UtteranceId {
        match self {
            SpeechEvent::Start { utterance }
            | SpeechEvent::End { utterance }
            | SpeechEvent::Error { utterance, .. }
            | SpeechEvent::Boundary { utterance, .. } => *utterance,
        }
    }
}

/// Speech-synthesis primitive provided by the host
///
/// The engine is global to the playback surface: at most one utterance is
/// spoken at a time and `cancel` clears whatever is queued.
pub trait SpeechEngine: Send {
    fn is_available(&self) -> bool;
    fn voices(&self) -> Vec<Voice>;
    fn speak(&mut self, request: UtteranceRequest);
    fn cancel(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_speaking(&self) -> bool;
    fn is_paused(&self) -> bool;
}

/// Pick the first voice whose language matches `prefix` (`es` matches
/// `es-MX` and `es_ES`)
pub fn select_voice(voices: &[Voice], prefix: &str) -> Option<Voice> {
    let prefix = prefix.to_ascii_lowercase();
    voices
        .iter()
        .find(|v| {
            let lang = v.lang.to_ascii_lowercase();
            lang == prefix
                || lang
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('_'))
        })
        .cloned()
}

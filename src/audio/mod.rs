// Audio playback module
// Host-side clip abstraction, with a native backend built on Symphonia and cpal

pub mod decoder;
pub mod resample;
#[cfg(feature = "native-audio")]
pub mod output;
#[cfg(feature = "native-audio")]
pub mod player;

use std::path::Path;

#[cfg(feature = "native-audio")]
pub use player::NativeAudioHost;

/// Which driver a clip belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipOwner {
    Stanza,
    Effect,
}

/// Identity of one opened clip
///
/// Serial numbers are never reused by an owner, so an event tagged with an
/// old id can always be told apart from the current clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId {
    pub owner: ClipOwner,
    pub serial: u64,
}

impl ClipId {
    pub fn stanza(serial: u64) -> Self {
        Self { owner: ClipOwner::Stanza, serial }
    }

    pub fn effect(serial: u64) -> Self {
        Self { owner: ClipOwner::Effect, serial }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEventKind {
    /// Enough data is available to start playback
    Ready,
    /// `play` went through and sound is being produced
    Started,
    /// The clip loaded but refused to start
    PlayRejected(String),
    /// The clip ran to its end
    Ended,
    /// The asset is missing or could not be decoded
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEvent {
    pub clip: ClipId,
    pub kind: AudioEventKind,
}

impl AudioEvent {
    pub fn new(clip: ClipId, kind: AudioEventKind) -> Self {
        Self { clip, kind }
    }
}

/// Audio playback primitive provided by the host
///
/// Outcomes of `open` and `play` are reported asynchronously as
/// [`AudioEvent`]s tagged with the clip's id.
pub trait AudioHost {
    type Clip: AudioClip;

    /// Start loading `path`. Never fails synchronously; a missing file shows
    /// up later as [`AudioEventKind::Failed`].
    fn open(&self, id: ClipId, path: &Path) -> Self::Clip;
}

/// A loaded (or loading) clip. Dropping it stops playback and releases it.
pub trait AudioClip: Send {
    fn id(&self) -> ClipId;

    /// Request playback. If the clip is still loading it starts once ready.
    fn play(&mut self);

    /// Freeze playback. Returns `false` if the clip was not producing sound.
    fn pause(&mut self) -> bool;

    /// Continue a paused clip. Returns `false` if there was nothing to resume.
    fn resume(&mut self) -> bool;

    /// Seek back to the first sample
    fn rewind(&mut self);
}

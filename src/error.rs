// Error types shared across the player
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to probe audio format: {0}")]
    Probe(String),
    #[error("no audio track found")]
    NoTrack,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("resample failed: {0}")]
    Resample(String),
    #[error("audio output unavailable: {0}")]
    Output(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech synthesis is not available on this system")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum PoemError {
    #[error("failed to read poem file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("poem has no stanzas")]
    Empty,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to write settings file: {0}")]
    Write(#[source] std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("playback session has shut down")]
    Closed,
    #[error(transparent)]
    Speech(#[from] SpeechError),
}

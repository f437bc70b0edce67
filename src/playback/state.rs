// Playback lifecycle shared by both drivers
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Ended,
}

impl PlaybackState {
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

/// Listener for driver transitions
///
/// Called synchronously from the driver, on the session's event loop.
pub trait PlaybackObserver: Send {
    fn state_changed(&self, state: PlaybackState);

    /// A new stanza became current. Only the stanza sequencer reports this.
    fn stanza_changed(&self, _index: usize) {}
}

/// Observer that writes every transition to the log
pub struct LoggingObserver {
    driver: &'static str,
}

impl LoggingObserver {
    pub fn new(driver: &'static str) -> Self {
        Self { driver }
    }
}

impl PlaybackObserver for LoggingObserver {
    fn state_changed(&self, state: PlaybackState) {
        info!(driver = self.driver, ?state, "playback state changed");
    }

    fn stanza_changed(&self, index: usize) {
        info!(driver = self.driver, stanza = index + 1, "stanza started");
    }
}

// Playback drivers and the session that hosts them

pub mod runtime;
pub mod sequencer;
pub mod state;
pub mod timer;

pub use runtime::{Command, Session, SessionHandle, SessionObserver, SessionSnapshot};
pub use sequencer::{SequencerTiming, StanzaSequencer};
pub use state::{LoggingObserver, PlaybackObserver, PlaybackState};

// Application state management
use parking_lot::Mutex;
use std::path::PathBuf;

use crate::playback::SessionHandle;
use crate::settings::AppSettings;
use crate::speech::webview::SpeechBridge;

pub struct AppState {
    pub session: SessionHandle,
    pub speech: SpeechBridge,
    pub settings: Mutex<AppSettings>,
    pub app_dir: PathBuf,
}

impl AppState {
    pub fn new(session: SessionHandle, speech: SpeechBridge, settings: AppSettings, app_dir: PathBuf) -> Self {
        Self {
            session,
            speech,
            settings: Mutex::new(settings),
            app_dir,
        }
    }

    /// Remember the interface choices for the next launch
    pub fn persist_interface(&self, update: impl FnOnce(&mut AppSettings)) -> Result<(), String> {
        let mut settings = self.settings.lock();
        update(&mut settings);
        settings
            .save(&self.app_dir)
            .map_err(|e| format!("Failed to save settings: {}", e))
    }
}

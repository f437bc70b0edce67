// Calavera - Narrated Calavera Literaria player
// Module declarations
pub mod audio;
pub mod error;
pub mod playback;
pub mod poem;
pub mod settings;
pub mod speech;
pub mod view;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod state;
#[cfg(test)]
mod testing;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter;
/// calling this twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("calavera=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use audio::NativeAudioHost;
    use playback::{Session, SessionObserver, SessionSnapshot};
    use poem::Poem;
    use settings::AppSettings;
    use speech::webview::{SpeechBridge, WebviewSpeech};
    use state::AppState;
    use tauri::{AppHandle, Emitter, Manager};
    use tracing::warn;

    struct SnapshotEmitter(AppHandle);

    impl SessionObserver for SnapshotEmitter {
        fn snapshot_changed(&self, snapshot: &SessionSnapshot) {
            if let Err(e) = self.0.emit("playback://snapshot", snapshot) {
                warn!(error = %e, "failed to emit playback snapshot");
            }
        }
    }

    init_tracing();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            // Get app data directory
            let app_dir = app.path().app_data_dir()
                .expect("Failed to get app data directory");
            let resource_dir = app.path().resource_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."));

            let settings = AppSettings::load(&app_dir).unwrap_or_else(|e| {
                warn!(error = %e, "unreadable settings, using defaults");
                AppSettings::default()
            });
            let mut session_settings = settings.clone();
            session_settings.assets = settings.assets.resolve(&resource_dir);

            // Initialize audio output
            let (audio_tx, audio_rx) = tokio::sync::mpsc::unbounded_channel();
            let host = NativeAudioHost::new(audio_tx)
                .expect("Failed to initialize audio output");

            let bridge = SpeechBridge::default();
            let engine = WebviewSpeech::new(app.handle().clone(), bridge.clone());
            let observer = SnapshotEmitter(app.handle().clone());

            let (session, _task) = tauri::async_runtime::block_on(async move {
                Session::spawn(
                    Poem::bundled(),
                    &session_settings,
                    host,
                    engine,
                    audio_rx,
                    Some(Box::new(observer)),
                )
            });

            // Create and manage app state
            app.manage(AppState::new(session, bridge, settings, app_dir));

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::play,
            commands::pause,
            commands::resume,
            commands::stop,
            commands::replay,
            commands::toggle_show_all,
            commands::set_surface,
            commands::get_snapshot,
            commands::speech_capabilities,
            commands::speech_event,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

// Tauri command handlers
use tauri::State;
use tracing::warn;

use crate::playback::{Command, SessionSnapshot};
use crate::settings::Surface;
use crate::speech::{SpeechEvent, Voice};
use crate::state::AppState;

async fn send(state: &AppState, command: Command) -> Result<SessionSnapshot, String> {
    state
        .session
        .send(command)
        .await
        .map_err(|e| format!("Failed to {:?}: {}", command, e))
}

#[tauri::command]
pub async fn play(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    send(&state, Command::Play).await
}

#[tauri::command]
pub async fn pause(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    send(&state, Command::Pause).await
}

#[tauri::command]
pub async fn resume(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    send(&state, Command::Resume).await
}

#[tauri::command]
pub async fn stop(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    send(&state, Command::Stop).await
}

#[tauri::command]
pub async fn replay(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    send(&state, Command::Replay).await
}

#[tauri::command]
pub async fn toggle_show_all(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    let snapshot = send(&state, Command::ToggleShowAll).await?;
    let show_all = snapshot.show_all;
    if let Err(e) = state.persist_interface(|s| s.interface.show_all = show_all) {
        warn!(error = %e, "show-all preference not saved");
    }
    Ok(snapshot)
}

#[tauri::command]
pub async fn set_surface(
    surface: Surface,
    state: State<'_, AppState>,
) -> Result<SessionSnapshot, String> {
    let snapshot = send(&state, Command::SetSurface(surface)).await?;
    if let Err(e) = state.persist_interface(|s| s.interface.surface = surface) {
        warn!(error = %e, "surface preference not saved");
    }
    Ok(snapshot)
}

#[tauri::command]
pub async fn get_snapshot(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    send(&state, Command::Snapshot).await
}

// ===== Speech bridge =====

/// Called by the page once it knows whether speech synthesis exists
#[tauri::command]
pub async fn speech_capabilities(
    available: bool,
    voices: Vec<Voice>,
    state: State<'_, AppState>,
) -> Result<SessionSnapshot, String> {
    state.speech.set_capabilities(available, voices);
    send(&state, Command::Snapshot).await
}

#[tauri::command]
pub fn speech_event(event: SpeechEvent, state: State<'_, AppState>) -> Result<(), String> {
    state.speech.observe(&event);
    state
        .session
        .speech_event(event)
        .map_err(|e| format!("Failed to forward speech event: {}", e))
}

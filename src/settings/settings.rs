// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SettingsError;
use crate::playback::sequencer::SequencerTiming;
use crate::poem::StanzaAssets;
use crate::speech::{SpeechPreset, Trigger};

/// A named sound effect file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectConfig {
    pub name: String,
    pub path: PathBuf,
}

/// Where the audio lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub stanza_dir: PathBuf,
    pub stanza_prefix: String,
    pub stanza_extension: String,
    pub effects: Vec<EffectConfig>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        let effect = |name: &str| EffectConfig {
            name: name.to_string(),
            path: PathBuf::from(format!("assets/sounds/{}.mp3", name)),
        };
        Self {
            stanza_dir: PathBuf::from("assets/audio"),
            stanza_prefix: "stanza".to_string(),
            stanza_extension: "wav".to_string(),
            effects: vec![
                effect("dramatic"),
                effect("laugh"),
                effect("chains"),
                effect("steps"),
            ],
        }
    }
}

impl AssetSettings {
    /// Resolve relative paths against `base`
    pub fn resolve(&self, base: &Path) -> Self {
        Self {
            stanza_dir: base.join(&self.stanza_dir),
            effects: self
                .effects
                .iter()
                .map(|e| EffectConfig {
                    name: e.name.clone(),
                    path: base.join(&e.path),
                })
                .collect(),
            ..self.clone()
        }
    }

    pub fn stanza_assets(&self) -> StanzaAssets {
        StanzaAssets::new(
            self.stanza_dir.clone(),
            self.stanza_prefix.clone(),
            self.stanza_extension.clone(),
        )
    }

    pub fn effect_paths(&self) -> Vec<(String, PathBuf)> {
        self.effects
            .iter()
            .map(|e| (e.name.clone(), e.path.clone()))
            .collect()
    }
}

/// Timing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub probe_ms: u64,     // wait for a load signal
    pub fallback_ms: u64,  // linger on a stanza that cannot play
    pub replay_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            probe_ms: 500,
            fallback_ms: 10_000,
            replay_delay_ms: 150,
        }
    }
}

impl TimingSettings {
    pub fn sequencer(&self) -> SequencerTiming {
        SequencerTiming {
            probe: Duration::from_millis(self.probe_ms),
            fallback: Duration::from_millis(self.fallback_ms),
        }
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }
}

/// Narration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub language: String, // language prefix, e.g. "es"
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub triggers: Vec<Trigger>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        let preset = SpeechPreset::default();
        Self {
            language: preset.lang_prefix,
            rate: preset.rate,
            pitch: preset.pitch,
            volume: preset.volume,
            triggers: vec![
                Trigger::new("cadena", "chains").unless("encadenad"),
                Trigger::new("pasos", "steps"),
            ],
        }
    }
}

impl SpeechSettings {
    pub fn preset(&self) -> SpeechPreset {
        SpeechPreset {
            lang_prefix: self.language.clone(),
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
        }
    }
}

/// Which playback surface opens first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    #[default]
    Stanzas,
    Narration,
}

/// Interface settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InterfaceSettings {
    pub surface: Surface,
    pub show_all: bool,
}

/// Main application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub assets: AssetSettings,
    pub timing: TimingSettings,
    pub speech: SpeechSettings,
    pub interface: InterfaceSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            assets: AssetSettings::default(),
            timing: TimingSettings::default(),
            speech: SpeechSettings::default(),
            interface: InterfaceSettings::default(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self, SettingsError> {
        Self::load_file(&Self::get_settings_path(app_dir))
    }

    pub fn load_file(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(SettingsError::Read)?;
        let settings: AppSettings = serde_json::from_str(&content).map_err(SettingsError::Parse)?;

        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<(), SettingsError> {
        fs::create_dir_all(app_dir).map_err(SettingsError::Write)?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).map_err(SettingsError::Parse)?;
        fs::write(&path, content).map_err(SettingsError::Write)?;

        info!(path = %path.display(), "saved settings");
        Ok(())
    }
}

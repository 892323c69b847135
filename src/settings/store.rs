//! Voice settings with clamped setters and write-through persistence

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info, warn};

use super::kv::KeyValueStore;

/// Wake word used until one is configured
pub const DEFAULT_WAKE_WORD: &str = "hey aura";

/// Valid volume range (inclusive)
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);
/// Valid pitch range (inclusive)
pub const PITCH_RANGE: (f32, f32) = (0.1, 2.0);
/// Valid speaking rate range (inclusive)
pub const RATE_RANGE: (f32, f32) = (0.1, 2.0);

const DEFAULT_VOLUME: f32 = 1.0;
const DEFAULT_PITCH: f32 = 1.0;
const DEFAULT_RATE: f32 = 1.0;

/// Storage keys
mod keys {
    pub const WAKE_WORD: &str = "wakeWord";
    pub const WAKE_WORD_ENABLED: &str = "wakeWordEnabled";
    pub const VOLUME: &str = "volume";
    pub const PITCH: &str = "pitch";
    pub const RATE: &str = "rate";
    pub const PREFERRED_VOICE: &str = "preferredVoice";
}

/// Snapshot of the durable voice settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub wake_word: String,
    pub wake_word_enabled: bool,
    pub volume: f32,
    pub pitch: f32,
    pub rate: f32,
    pub preferred_voice_id: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            wake_word_enabled: true,
            volume: DEFAULT_VOLUME,
            pitch: DEFAULT_PITCH,
            rate: DEFAULT_RATE,
            preferred_voice_id: None,
        }
    }
}

/// Partial settings change; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_word_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,
    /// `Some(None)` (JSON `null`) clears the preferred voice
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub preferred_voice_id: Option<Option<String>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Owns the in-memory settings and writes every change through to storage
pub struct SettingsStore {
    store: Box<dyn KeyValueStore>,
    current: VoiceSettings,
}

impl SettingsStore {
    /// Load settings, falling back to defaults for missing or corrupt values
    pub fn load(store: impl KeyValueStore + 'static) -> Self {
        let defaults = VoiceSettings::default();

        let wake_word = store
            .get(keys::WAKE_WORD)
            .and_then(|w| normalize_wake_word(&w))
            .unwrap_or(defaults.wake_word);

        let wake_word_enabled = match store.get(keys::WAKE_WORD_ENABLED).as_deref() {
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                warn!(value = other, "ignoring corrupt wakeWordEnabled setting");
                defaults.wake_word_enabled
            }
            None => defaults.wake_word_enabled,
        };

        let volume = load_float(&store, keys::VOLUME, VOLUME_RANGE, DEFAULT_VOLUME);
        let pitch = load_float(&store, keys::PITCH, PITCH_RANGE, DEFAULT_PITCH);
        let rate = load_float(&store, keys::RATE, RATE_RANGE, DEFAULT_RATE);

        let preferred_voice_id = store
            .get(keys::PREFERRED_VOICE)
            .filter(|id| !id.trim().is_empty());

        let current = VoiceSettings {
            wake_word,
            wake_word_enabled,
            volume,
            pitch,
            rate,
            preferred_voice_id,
        };
        debug!(?current, "voice settings loaded");

        Self {
            store: Box::new(store),
            current,
        }
    }

    pub fn snapshot(&self) -> VoiceSettings {
        self.current.clone()
    }

    pub fn wake_word(&self) -> &str {
        &self.current.wake_word
    }

    pub fn wake_word_enabled(&self) -> bool {
        self.current.wake_word_enabled
    }

    pub fn volume(&self) -> f32 {
        self.current.volume
    }

    pub fn pitch(&self) -> f32 {
        self.current.pitch
    }

    pub fn rate(&self) -> f32 {
        self.current.rate
    }

    pub fn preferred_voice_id(&self) -> Option<&str> {
        self.current.preferred_voice_id.as_deref()
    }

    /// Set the wake word; blank input keeps the current one
    pub fn set_wake_word(&mut self, word: &str) -> &str {
        match normalize_wake_word(word) {
            Some(word) => {
                info!(wake_word = %word, "wake word updated");
                self.persist(keys::WAKE_WORD, &word);
                self.current.wake_word = word;
            }
            None => {
                warn!(kept = %self.current.wake_word, "ignoring blank wake word");
            }
        }
        &self.current.wake_word
    }

    pub fn set_wake_word_enabled(&mut self, enabled: bool) {
        info!(enabled, "wake word checking toggled");
        self.current.wake_word_enabled = enabled;
        self.persist(keys::WAKE_WORD_ENABLED, if enabled { "true" } else { "false" });
    }

    /// Set the volume, clamped to [`VOLUME_RANGE`]; returns the stored value
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = clamp_setting(keys::VOLUME, volume, VOLUME_RANGE, DEFAULT_VOLUME);
        self.current.volume = volume;
        self.persist(keys::VOLUME, &volume.to_string());
        volume
    }

    /// Set the pitch, clamped to [`PITCH_RANGE`]; returns the stored value
    pub fn set_pitch(&mut self, pitch: f32) -> f32 {
        let pitch = clamp_setting(keys::PITCH, pitch, PITCH_RANGE, DEFAULT_PITCH);
        self.current.pitch = pitch;
        self.persist(keys::PITCH, &pitch.to_string());
        pitch
    }

    /// Set the rate, clamped to [`RATE_RANGE`]; returns the stored value
    pub fn set_rate(&mut self, rate: f32) -> f32 {
        let rate = clamp_setting(keys::RATE, rate, RATE_RANGE, DEFAULT_RATE);
        self.current.rate = rate;
        self.persist(keys::RATE, &rate.to_string());
        rate
    }

    /// Choose a synthesis voice by id, or clear the choice with `None`
    pub fn set_preferred_voice(&mut self, voice_id: Option<&str>) {
        let voice_id = voice_id.map(str::trim).filter(|id| !id.is_empty());
        info!(voice_id = ?voice_id, "preferred voice updated");

        match voice_id {
            Some(id) => self.persist(keys::PREFERRED_VOICE, id),
            None => {
                if let Err(e) = self.store.remove(keys::PREFERRED_VOICE) {
                    error!(error = %e, "failed to clear preferred voice");
                }
            }
        }
        self.current.preferred_voice_id = voice_id.map(str::to_string);
    }

    /// Apply every field present in `update`
    pub fn apply(&mut self, update: SettingsUpdate) -> VoiceSettings {
        if let Some(word) = update.wake_word {
            self.set_wake_word(&word);
        }
        if let Some(enabled) = update.wake_word_enabled {
            self.set_wake_word_enabled(enabled);
        }
        if let Some(volume) = update.volume {
            self.set_volume(volume);
        }
        if let Some(pitch) = update.pitch {
            self.set_pitch(pitch);
        }
        if let Some(rate) = update.rate {
            self.set_rate(rate);
        }
        if let Some(voice) = update.preferred_voice_id {
            self.set_preferred_voice(voice.as_deref());
        }
        self.snapshot()
    }

    fn persist(&mut self, key: &str, value: &str) {
        // The in-memory value still applies for this run
        if let Err(e) = self.store.set(key, value) {
            error!(key, error = %e, "failed to persist voice setting");
        }
    }
}

fn normalize_wake_word(word: &str) -> Option<String> {
    let word = word.trim().to_lowercase();
    (!word.is_empty()).then_some(word)
}

fn load_float(store: &impl KeyValueStore, key: &'static str, range: (f32, f32), default: f32) -> f32 {
    match store.get(key) {
        Some(raw) => match raw.trim().parse::<f32>() {
            Ok(value) => clamp_setting(key, value, range, default),
            Err(_) => {
                warn!(key, value = %raw, "ignoring corrupt voice setting");
                default
            }
        },
        None => default,
    }
}

fn clamp_setting(name: &'static str, value: f32, (min, max): (f32, f32), default: f32) -> f32 {
    let stored = if value.is_nan() {
        default
    } else {
        value.clamp(min, max)
    };

    if stored != value {
        warn!(setting = name, requested = value, stored, "voice setting out of range, clamped");
    }
    stored
}

//! Durable voice settings
//!
//! Wake word, wake-word enablement, volume, pitch, rate and the preferred
//! synthesis voice. Every setter clamps its input and persists before
//! returning.

mod kv;
mod store;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use store::{
    SettingsStore, SettingsUpdate, VoiceSettings, DEFAULT_WAKE_WORD, PITCH_RANGE, RATE_RANGE,
    VOLUME_RANGE,
};

//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::capability::VoiceInfo;
use crate::controller::VoiceStatus;
use crate::events::VoiceEvent;
use crate::settings::{SettingsUpdate, VoiceSettings};

/// Largest frame either side may send
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    GetStatus,

    GetSettings,

    ListVoices,

    /// Flip continuous listening on or off
    ToggleListening,

    /// Say something, interrupting whatever is being said
    Speak { text: String },

    /// Partial settings change; absent fields are left alone
    UpdateSettings { settings: SettingsUpdate },

    /// Subscribe to voice event notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,

    Status(VoiceStatus),

    /// Current (or just stored) settings
    Settings(VoiceSettings),

    Voices { voices: Vec<VoiceInfo> },

    /// Listening state after a toggle
    Listening { listening: bool },

    /// Speech request queued
    Accepted,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A voice event was published
    Event { event: VoiceEvent },

    /// The client fell behind and missed events
    Lagged { skipped: u64 },
}

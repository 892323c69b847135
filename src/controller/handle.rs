//! Cloneable front door to a running controller

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::capability::VoiceInfo;
use crate::error::{Result, VoiceError};
use crate::events::VoiceEvent;
use crate::settings::{SettingsUpdate, VoiceSettings};
use crate::state::{GateState, WindowId};
use crate::synthesis::{ListenerId, SpeakingListeners};

/// Gate state without window bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    Idle,
    Armed,
    Disabled,
}

impl From<GateState> for GateMode {
    fn from(state: GateState) -> Self {
        match state {
            GateState::Idle => GateMode::Idle,
            GateState::Armed(_) => GateMode::Armed,
            GateState::Disabled => GateMode::Disabled,
        }
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceStatus {
    pub version: String,
    pub listening: bool,
    pub waiting_for_command: bool,
    pub speaking: bool,
    pub gate: GateMode,
    pub wake_word_enabled: bool,
    pub recognition_supported: bool,
    pub synthesis_supported: bool,
    pub uptime_secs: u64,
}

/// Messages processed by the controller loop
#[derive(Debug)]
pub(crate) enum ControllerMessage {
    DeadlineElapsed(WindowId),
    ToggleListening(oneshot::Sender<bool>),
    Speak(String),
    Status(oneshot::Sender<VoiceStatus>),
    Settings(oneshot::Sender<VoiceSettings>),
    UpdateSettings(SettingsUpdate, oneshot::Sender<VoiceSettings>),
    Voices(oneshot::Sender<Vec<VoiceInfo>>),
    Shutdown(oneshot::Sender<()>),
}

/// Public API of the voice controller
#[derive(Clone)]
pub struct ControllerHandle {
    inbox: mpsc::UnboundedSender<ControllerMessage>,
    event_tx: broadcast::Sender<VoiceEvent>,
    listeners: SpeakingListeners,
}

impl ControllerHandle {
    pub(crate) fn new(
        inbox: mpsc::UnboundedSender<ControllerMessage>,
        event_tx: broadcast::Sender<VoiceEvent>,
        listeners: SpeakingListeners,
    ) -> Self {
        Self {
            inbox,
            event_tx,
            listeners,
        }
    }

    /// Flip continuous listening; returns whether it is now on
    pub async fn toggle_listening(&self) -> Result<bool> {
        self.request(ControllerMessage::ToggleListening).await
    }

    /// Queue `text` for speech
    pub fn speak(&self, text: impl Into<String>) -> Result<()> {
        self.inbox
            .send(ControllerMessage::Speak(text.into()))
            .map_err(|_| VoiceError::ControllerStopped)
    }

    pub async fn status(&self) -> Result<VoiceStatus> {
        self.request(ControllerMessage::Status).await
    }

    pub async fn settings(&self) -> Result<VoiceSettings> {
        self.request(ControllerMessage::Settings).await
    }

    /// Apply a partial settings change; returns the stored (clamped) settings
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<VoiceSettings> {
        self.request(|reply| ControllerMessage::UpdateSettings(update, reply))
            .await
    }

    pub async fn voices(&self) -> Result<Vec<VoiceInfo>> {
        self.request(ControllerMessage::Voices).await
    }

    /// Stop recognition and speech, then end the controller loop
    pub async fn shutdown(&self) -> Result<()> {
        self.request(ControllerMessage::Shutdown).await
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.event_tx.subscribe()
    }

    pub fn add_speaking_state_listener(
        &self,
        listener: impl Fn(bool) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Safe to call for ids that were never added or already removed
    pub fn remove_speaking_state_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> ControllerMessage,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inbox
            .send(message(reply_tx))
            .map_err(|_| VoiceError::ControllerStopped)?;
        reply_rx.await.map_err(|_| VoiceError::ControllerStopped)
    }
}

//! Events published by the voice controller
//!
//! The UI layer consumes these over IPC: live transcripts, assistant
//! replies, the speaking-state stream and listening/gate changes.

use serde::{Deserialize, Serialize};

/// Notifications emitted as the controller handles speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// Current interim or final transcript text
    TranscriptUpdate { text: String, is_final: bool },

    /// Reply produced for a dispatched command (or the apology)
    AssistantResponse { text: String },

    /// Synthesis started or stopped producing audio
    SpeakingChanged { speaking: bool },

    /// Continuous recognition was turned on or off
    ListeningChanged { listening: bool },

    /// Wake word heard, awaiting a command
    WakeWordDetected,

    /// A command was accepted and sent to the dispatcher
    CommandAccepted { command: String },

    /// The command window closed without a command
    CommandWindowExpired,

    /// Recognition stopped because the engine failed
    RecognitionFault { message: String },
}

impl std::fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceEvent::TranscriptUpdate { text, is_final } => {
                let kind = if *is_final { "final" } else { "interim" };
                write!(f, "TRANSCRIPT_UPDATE ({kind}: {text:?})")
            }
            VoiceEvent::AssistantResponse { text } => write!(f, "ASSISTANT_RESPONSE ({text:?})"),
            VoiceEvent::SpeakingChanged { speaking } => write!(f, "SPEAKING_CHANGED ({speaking})"),
            VoiceEvent::ListeningChanged { listening } => {
                write!(f, "LISTENING_CHANGED ({listening})")
            }
            VoiceEvent::WakeWordDetected => write!(f, "WAKE_WORD_DETECTED"),
            VoiceEvent::CommandAccepted { command } => write!(f, "COMMAND_ACCEPTED ({command:?})"),
            VoiceEvent::CommandWindowExpired => write!(f, "COMMAND_WINDOW_EXPIRED"),
            VoiceEvent::RecognitionFault { message } => write!(f, "RECOGNITION_FAULT ({message})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = VoiceEvent::TranscriptUpdate {
            text: "hey aura".to_string(),
            is_final: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("transcript_update"));
        assert!(json.contains("\"is_final\":false"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"speaking_changed","speaking":true}"#;
        let event: VoiceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, VoiceEvent::SpeakingChanged { speaking: true });
    }

    #[test]
    fn test_event_display() {
        assert_eq!(VoiceEvent::WakeWordDetected.to_string(), "WAKE_WORD_DETECTED");
        assert_eq!(
            VoiceEvent::AssistantResponse { text: "hi".into() }.to_string(),
            "ASSISTANT_RESPONSE (\"hi\")"
        );
    }
}

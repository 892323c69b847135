//! Error types for the voice controller

use thiserror::Error;

/// Platform capabilities whose absence is reported as an error
///
/// Missing synthesis is not an error: speech requests become no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Continuous speech recognition
    Recognition,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Recognition => write!(f, "speech recognition"),
        }
    }
}

/// Errors raised inside the voice core
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("{0} is not supported on this platform")]
    UnsupportedCapability(Capability),

    #[error("recognition engine fault: {0}")]
    RecognitionFault(String),

    #[error("voice controller has stopped")]
    ControllerStopped,

    #[error("settings storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for voice core operations
pub type Result<T> = std::result::Result<T, VoiceError>;

//! Platform speech capabilities
//!
//! Recognition and synthesis engines are injected through a
//! [`CapabilityProvider`] so the gate, dispatcher and controller run the
//! same way against a real engine, the console harness, or a test fake.
//! Engines report back through sinks; the controller drains the other end.

mod console;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

pub use console::{ConsoleCapabilities, ConsoleRecognizer, ConsoleSpeaker};

/// Raw callback from a recognition engine
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// A recognized utterance, partial or committed
    Result { transcript: String, is_final: bool },
    /// The engine hit a hard error
    Error(String),
    /// The engine session ended at a natural utterance boundary
    Ended,
}

/// Handle given to a recognition engine for reporting results
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    tx: mpsc::UnboundedSender<RecognitionEvent>,
}

impl RecognitionSink {
    pub fn new(tx: mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self { tx }
    }

    pub fn result(&self, transcript: impl Into<String>, is_final: bool) {
        self.send(RecognitionEvent::Result {
            transcript: transcript.into(),
            is_final,
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(RecognitionEvent::Error(message.into()));
    }

    pub fn ended(&self) {
        self.send(RecognitionEvent::Ended);
    }

    fn send(&self, event: RecognitionEvent) {
        // The controller is gone; nothing is left to notify
        let _ = self.tx.send(event);
    }
}

/// Continuous speech recognition engine
pub trait RecognitionEngine: Send + Sync {
    /// Begin a capture session reporting into `sink`
    fn start(&self, sink: RecognitionSink) -> Result<()>;

    /// End the current capture session, if any
    fn stop(&self);
}

/// Identifies one synthesis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

/// A voice offered by the synthesis engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub lang: String,
}

/// Everything the engine needs to voice one piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub lang: String,
    pub voice: Option<VoiceInfo>,
    pub volume: f32,
    pub pitch: f32,
    pub rate: f32,
}

/// Lifecycle callback for an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started(UtteranceId),
    Ended(UtteranceId),
    Failed(UtteranceId),
}

/// Handle given to a synthesis engine for reporting utterance progress
#[derive(Debug, Clone)]
pub struct SynthesisSink {
    tx: mpsc::UnboundedSender<SynthesisEvent>,
}

impl SynthesisSink {
    pub fn new(tx: mpsc::UnboundedSender<SynthesisEvent>) -> Self {
        Self { tx }
    }

    pub fn started(&self, id: UtteranceId) {
        let _ = self.tx.send(SynthesisEvent::Started(id));
    }

    pub fn ended(&self, id: UtteranceId) {
        let _ = self.tx.send(SynthesisEvent::Ended(id));
    }

    pub fn failed(&self, id: UtteranceId) {
        let _ = self.tx.send(SynthesisEvent::Failed(id));
    }
}

/// Speech synthesis engine with a single output channel
pub trait SynthesisEngine: Send + Sync {
    /// Voices available right now; may be empty while the engine warms up
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Start voicing `utterance`, reporting progress into `sink`
    fn speak(&self, utterance: Utterance, sink: SynthesisSink);

    /// Silence whatever is currently being voiced
    fn cancel(&self);
}

/// Detects which speech engines the host offers
pub trait CapabilityProvider {
    fn recognition(&self) -> Option<Arc<dyn RecognitionEngine>>;

    fn synthesis(&self) -> Option<Arc<dyn SynthesisEngine>>;
}

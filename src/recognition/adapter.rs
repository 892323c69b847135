//! Continuous recognition on top of a session-based engine
//!
//! Engines end their session at natural utterance boundaries. While
//! listening is desired the adapter starts a new session right away; a hard
//! engine error drops the desire to listen, so nothing restarts until the
//! user asks again.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::transcript::Transcript;
use crate::capability::{RecognitionEngine, RecognitionEvent, RecognitionSink};
use crate::error::{Capability, Result, VoiceError};

/// What an engine event meant for the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOutput {
    /// A normalized transcript to publish (and gate, when final)
    Transcript(Transcript),
    /// Nothing for the controller to act on
    Quiet,
    /// Recognition stopped on an engine fault
    Fault(String),
}

/// Wraps a recognition engine with start/stop and the reconnect policy
pub struct RecognitionAdapter {
    engine: Option<Arc<dyn RecognitionEngine>>,
    sink: RecognitionSink,
    /// The user wants continuous capture
    desired_listening: bool,
    /// An engine session is live
    session_active: bool,
}

impl RecognitionAdapter {
    pub fn new(engine: Option<Arc<dyn RecognitionEngine>>, sink: RecognitionSink) -> Self {
        Self {
            engine,
            sink,
            desired_listening: false,
            session_active: false,
        }
    }

    /// An engine is present on this host
    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.desired_listening
    }

    /// Begin continuous capture; a no-op when already listening
    pub fn start(&mut self) -> Result<()> {
        let engine = self
            .engine
            .clone()
            .ok_or(VoiceError::UnsupportedCapability(Capability::Recognition))?;

        if self.desired_listening && self.session_active {
            debug!("recognition already running");
            return Ok(());
        }

        engine.start(self.sink.clone())?;
        self.desired_listening = true;
        self.session_active = true;
        info!("recognition started");
        Ok(())
    }

    /// Halt capture; a no-op when already stopped
    pub fn stop(&mut self) {
        if !self.desired_listening && !self.session_active {
            return;
        }

        self.desired_listening = false;
        if let Some(engine) = &self.engine {
            engine.stop();
        }
        self.session_active = false;
        info!("recognition stopped");
    }

    /// Interpret one engine callback
    pub fn on_event(&mut self, event: RecognitionEvent) -> AdapterOutput {
        match event {
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                if !self.desired_listening {
                    debug!(transcript, "dropping result received after stop");
                    return AdapterOutput::Quiet;
                }
                AdapterOutput::Transcript(Transcript::new(&transcript, is_final))
            }
            RecognitionEvent::Ended => {
                self.session_active = false;
                if self.desired_listening {
                    self.restart()
                } else {
                    debug!("recognition session ended");
                    AdapterOutput::Quiet
                }
            }
            RecognitionEvent::Error(message) => {
                error!(error = %message, "speech recognition error");
                self.desired_listening = false;
                self.session_active = false;
                AdapterOutput::Fault(message)
            }
        }
    }

    fn restart(&mut self) -> AdapterOutput {
        let Some(engine) = self.engine.clone() else {
            return AdapterOutput::Quiet;
        };

        match engine.start(self.sink.clone()) {
            Ok(()) => {
                self.session_active = true;
                debug!("recognition session restarted");
                AdapterOutput::Quiet
            }
            Err(e) => {
                warn!(error = %e, "failed to restart recognition");
                self.desired_listening = false;
                AdapterOutput::Fault(e.to_string())
            }
        }
    }
}

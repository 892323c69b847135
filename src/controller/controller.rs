//! The voice interaction controller
//!
//! One task owns the session, settings, recognition adapter and synthesis
//! controller. Engine callbacks, deadline firings, dispatcher replies and
//! API requests all arrive on channels and are handled one at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::handle::{ControllerHandle, ControllerMessage, GateMode, VoiceStatus};
use crate::capability::{
    CapabilityProvider, RecognitionEvent, RecognitionSink, SynthesisEvent, SynthesisSink,
};
use crate::dispatch::{CommandDispatcher, ResponseGenerator};
use crate::error::VoiceError;
use crate::events::VoiceEvent;
use crate::recognition::{AdapterOutput, RecognitionAdapter};
use crate::settings::{SettingsStore, SettingsUpdate, VoiceSettings};
use crate::state::{GateAction, VoiceSession, WindowId};
use crate::synthesis::{SpeakingListeners, SynthesisController};

/// How long an armed gate waits for the command
pub const COMMAND_WINDOW: Duration = Duration::from_secs(5);

/// Spoken when the wake word is heard
pub const ACKNOWLEDGEMENT: &str = "I'm listening. How can I help?";

pub const RECOGNITION_UNSUPPORTED: &str = "Speech recognition is not supported on this device.";
pub const RECOGNITION_START_FAILED: &str = "I couldn't start listening. Please try again.";
pub const RECOGNITION_STOPPED: &str = "Voice recognition stopped.";

const EVENT_CAPACITY: usize = 64;

/// Owns all voice state and runs the event loop
pub struct VoiceController {
    session: VoiceSession,
    settings: SettingsStore,
    adapter: RecognitionAdapter,
    synthesis: SynthesisController,
    dispatcher: Arc<CommandDispatcher>,
    event_tx: broadcast::Sender<VoiceEvent>,
    inbox_tx: mpsc::UnboundedSender<ControllerMessage>,
    inbox_rx: mpsc::UnboundedReceiver<ControllerMessage>,
    recognition_rx: mpsc::UnboundedReceiver<RecognitionEvent>,
    synthesis_rx: mpsc::UnboundedReceiver<SynthesisEvent>,
    speech_rx: mpsc::UnboundedReceiver<String>,
    started_at: Instant,
}

impl VoiceController {
    /// Wire a controller to the host's capabilities
    ///
    /// The controller does nothing until [`VoiceController::run`] is polled;
    /// the handle can be cloned freely.
    pub fn new(
        capabilities: &dyn CapabilityProvider,
        generator: Arc<dyn ResponseGenerator>,
        settings: SettingsStore,
        generator_timeout: Duration,
    ) -> (Self, ControllerHandle) {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (recognition_tx, recognition_rx) = mpsc::unbounded_channel();
        let (synthesis_tx, synthesis_rx) = mpsc::unbounded_channel();
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();
        let listeners = SpeakingListeners::new();

        let adapter = RecognitionAdapter::new(
            capabilities.recognition(),
            RecognitionSink::new(recognition_tx),
        );
        let synthesis = SynthesisController::new(
            capabilities.synthesis(),
            SynthesisSink::new(synthesis_tx),
            listeners.clone(),
            event_tx.clone(),
        );
        let dispatcher = Arc::new(CommandDispatcher::new(
            generator,
            generator_timeout,
            speech_tx,
            event_tx.clone(),
        ));

        let handle = ControllerHandle::new(inbox_tx.clone(), event_tx.clone(), listeners);
        let controller = Self {
            session: VoiceSession::new(settings.wake_word_enabled()),
            settings,
            adapter,
            synthesis,
            dispatcher,
            event_tx,
            inbox_tx,
            inbox_rx,
            recognition_rx,
            synthesis_rx,
            speech_rx,
            started_at: Instant::now(),
        };

        (controller, handle)
    }

    /// Process events until shut down
    pub async fn run(mut self) {
        info!(
            wake_word = %self.settings.wake_word(),
            wake_word_enabled = self.settings.wake_word_enabled(),
            recognition = self.adapter.is_supported(),
            synthesis = self.synthesis.is_supported(),
            "voice controller started"
        );

        if !self.adapter.is_supported() {
            warn!("speech recognition is not supported on this host");
            self.speak(RECOGNITION_UNSUPPORTED);
        }

        loop {
            tokio::select! {
                Some(event) = self.recognition_rx.recv() => self.handle_recognition(event),
                Some(event) = self.synthesis_rx.recv() => self.synthesis.on_event(event),
                Some(text) = self.speech_rx.recv() => self.speak(&text),
                message = self.inbox_rx.recv() => match message {
                    Some(ControllerMessage::Shutdown(done)) => {
                        self.shutdown();
                        let _ = done.send(());
                        break;
                    }
                    Some(message) => self.handle_message(message),
                    None => break,
                },
            }
            self.sync_session();
        }

        info!("voice controller stopped");
    }

    fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::DeadlineElapsed(window) => self.handle_deadline(window),
            ControllerMessage::ToggleListening(reply) => {
                let listening = self.toggle_listening();
                let _ = reply.send(listening);
            }
            ControllerMessage::Speak(text) => self.speak(&text),
            ControllerMessage::Status(reply) => {
                let _ = reply.send(self.status());
            }
            ControllerMessage::Settings(reply) => {
                let _ = reply.send(self.settings.snapshot());
            }
            ControllerMessage::UpdateSettings(update, reply) => {
                let _ = reply.send(self.update_settings(update));
            }
            ControllerMessage::Voices(reply) => {
                let _ = reply.send(self.synthesis.voices());
            }
            ControllerMessage::Shutdown(done) => {
                self.shutdown();
                let _ = done.send(());
            }
        }
    }

    fn handle_recognition(&mut self, event: RecognitionEvent) {
        match self.adapter.on_event(event) {
            AdapterOutput::Transcript(transcript) => {
                self.publish(VoiceEvent::TranscriptUpdate {
                    text: transcript.text.clone(),
                    is_final: transcript.is_final,
                });
                if transcript.is_final {
                    self.handle_final(&transcript.text);
                }
            }
            AdapterOutput::Quiet => {}
            AdapterOutput::Fault(message) => {
                self.close_window();
                self.publish(VoiceEvent::ListeningChanged { listening: false });
                self.publish(VoiceEvent::RecognitionFault { message });
            }
        }
    }

    fn handle_final(&mut self, text: &str) {
        let wake_word = self.settings.wake_word().to_string();

        match self.session.gate_mut().on_final(text, &wake_word) {
            GateAction::Ignore => {}
            GateAction::Arm(window) => {
                self.speak(ACKNOWLEDGEMENT);
                self.start_deadline(window);
                self.publish(VoiceEvent::WakeWordDetected);
            }
            GateAction::Dispatch { command, closed } => {
                if closed.is_some() {
                    self.session.cancel_deadline();
                }
                self.publish(VoiceEvent::CommandAccepted {
                    command: command.clone(),
                });

                let dispatcher = Arc::clone(&self.dispatcher);
                tokio::spawn(async move {
                    dispatcher.handle(&command).await;
                });
            }
        }
    }

    fn start_deadline(&mut self, window: WindowId) {
        let inbox = self.inbox_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(COMMAND_WINDOW).await;
            let _ = inbox.send(ControllerMessage::DeadlineElapsed(window));
        });
        self.session.set_deadline(window, task);
    }

    fn handle_deadline(&mut self, window: WindowId) {
        self.session.deadline_fired(window);
        if self.session.gate_mut().on_deadline(window) {
            info!("timeout, listening for wake word again");
            self.publish(VoiceEvent::CommandWindowExpired);
        }
    }

    fn toggle_listening(&mut self) -> bool {
        if self.adapter.is_listening() {
            self.adapter.stop();
            self.close_window();
            self.publish(VoiceEvent::ListeningChanged { listening: false });
            self.speak(RECOGNITION_STOPPED);
            return false;
        }

        match self.adapter.start() {
            Ok(()) => {
                self.publish(VoiceEvent::ListeningChanged { listening: true });
                let greeting = activation_message(&self.settings);
                self.speak(&greeting);
                true
            }
            Err(VoiceError::UnsupportedCapability(capability)) => {
                warn!(%capability, "cannot start listening");
                self.speak(RECOGNITION_UNSUPPORTED);
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to start recognition");
                self.speak(RECOGNITION_START_FAILED);
                false
            }
        }
    }

    fn update_settings(&mut self, update: SettingsUpdate) -> VoiceSettings {
        let snapshot = self.settings.apply(update);
        if self
            .session
            .gate_mut()
            .set_enabled(snapshot.wake_word_enabled)
            .is_some()
        {
            self.session.cancel_deadline();
        }
        snapshot
    }

    fn status(&self) -> VoiceStatus {
        VoiceStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            listening: self.session.listening,
            waiting_for_command: self.session.waiting_for_command(),
            speaking: self.session.speaking,
            gate: GateMode::from(self.session.gate_state()),
            wake_word_enabled: self.settings.wake_word_enabled(),
            recognition_supported: self.adapter.is_supported(),
            synthesis_supported: self.synthesis.is_supported(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    fn speak(&mut self, text: &str) {
        self.synthesis.speak(text, &self.settings);
    }

    /// Close any open command window without dispatching
    fn close_window(&mut self) {
        self.session.cancel_deadline();
        self.session.gate_mut().reset();
    }

    fn shutdown(&mut self) {
        info!("voice controller shutting down");
        self.adapter.stop();
        self.close_window();
        self.synthesis.cancel();
    }

    fn sync_session(&mut self) {
        self.session.listening = self.adapter.is_listening();
        self.session.speaking = self.synthesis.is_speaking();
        debug_assert!(
            self.session.is_consistent(),
            "deadline out of step with gate: {:?}",
            self.session
        );
    }

    fn publish(&self, event: VoiceEvent) {
        debug!(%event, "publishing event");
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

fn activation_message(settings: &SettingsStore) -> String {
    if settings.wake_word_enabled() {
        format!(
            "Voice recognition activated. Say \"{}\" to start a command.",
            settings.wake_word()
        )
    } else {
        "Voice recognition activated. How can I help?".to_string()
    }
}

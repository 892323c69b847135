//! Command dispatch with an audible fallback on generator failure

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use super::generator::{GenerationError, ResponseGenerator};
use crate::events::VoiceEvent;

/// Spoken and returned whenever a reply cannot be generated
pub const APOLOGY: &str = "I'm sorry, I encountered an error processing your request.";

/// Forwards commands to the response generator and routes replies to speech
pub struct CommandDispatcher {
    generator: Arc<dyn ResponseGenerator>,
    timeout: Duration,
    speech_tx: mpsc::UnboundedSender<String>,
    event_tx: broadcast::Sender<VoiceEvent>,
}

impl CommandDispatcher {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        timeout: Duration,
        speech_tx: mpsc::UnboundedSender<String>,
        event_tx: broadcast::Sender<VoiceEvent>,
    ) -> Self {
        Self {
            generator,
            timeout,
            speech_tx,
            event_tx,
        }
    }

    /// Produce, speak and publish the reply to `command`
    ///
    /// Never fails: a generator error, timeout or empty reply becomes
    /// [`APOLOGY`].
    pub async fn handle(&self, command: &str) -> String {
        info!(command, "dispatching command");

        let reply = match self.generate(command).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(command, error = %e, "error processing command");
                APOLOGY.to_string()
            }
        };

        if self.speech_tx.send(reply.clone()).is_err() {
            warn!("speech channel closed, reply will not be spoken");
        }
        let _ = self.event_tx.send(VoiceEvent::AssistantResponse {
            text: reply.clone(),
        });

        reply
    }

    async fn generate(&self, command: &str) -> Result<String, GenerationError> {
        let reply = tokio::time::timeout(self.timeout, self.generator.generate(command))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        if reply.trim().is_empty() {
            return Err(GenerationError::Malformed("empty reply".to_string()));
        }
        Ok(reply)
    }
}

//! Single-channel speech output

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::listeners::SpeakingListeners;
use crate::capability::{
    SynthesisEngine, SynthesisEvent, SynthesisSink, Utterance, UtteranceId, VoiceInfo,
};
use crate::events::VoiceEvent;
use crate::settings::SettingsStore;

/// Language tag applied to every utterance
pub const UTTERANCE_LANG: &str = "en-US";

/// Serializes speech through one voice; the newest request wins
pub struct SynthesisController {
    engine: Option<Arc<dyn SynthesisEngine>>,
    sink: SynthesisSink,
    listeners: SpeakingListeners,
    event_tx: broadcast::Sender<VoiceEvent>,
    next_id: u64,
    current: Option<UtteranceId>,
    speaking: bool,
}

impl SynthesisController {
    pub fn new(
        engine: Option<Arc<dyn SynthesisEngine>>,
        sink: SynthesisSink,
        listeners: SpeakingListeners,
        event_tx: broadcast::Sender<VoiceEvent>,
    ) -> Self {
        if engine.is_none() {
            warn!("speech synthesis is not supported, replies will not be spoken");
        }

        Self {
            engine,
            sink,
            listeners,
            event_tx,
            next_id: 0,
            current: None,
            speaking: false,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.engine
            .as_ref()
            .map(|engine| engine.voices())
            .unwrap_or_default()
    }

    /// Speak `text` with the settings in effect right now
    ///
    /// Anything still being voiced is cancelled first. Without an engine
    /// this does nothing and returns `None`.
    pub fn speak(&mut self, text: &str, settings: &SettingsStore) -> Option<UtteranceId> {
        let Some(engine) = self.engine.clone() else {
            debug!(text, "no synthesis engine, not speaking");
            return None;
        };

        self.interrupt(engine.as_ref());

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        let utterance = Utterance {
            id,
            text: text.to_string(),
            lang: UTTERANCE_LANG.to_string(),
            voice: resolve_voice(&engine.voices(), settings.preferred_voice_id()),
            volume: settings.volume(),
            pitch: settings.pitch(),
            rate: settings.rate(),
        };

        info!(utterance = id.0, text, "speaking");
        self.current = Some(id);
        engine.speak(utterance, self.sink.clone());
        Some(id)
    }

    /// Silence any utterance in flight
    pub fn cancel(&mut self) {
        if let Some(engine) = self.engine.clone() {
            self.interrupt(engine.as_ref());
        }
    }

    /// Apply an engine callback; stale ids from cancelled utterances are dropped
    pub fn on_event(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::Started(id) if self.current == Some(id) => {
                self.set_speaking(true);
            }
            SynthesisEvent::Ended(id) | SynthesisEvent::Failed(id) if self.current == Some(id) => {
                if matches!(event, SynthesisEvent::Failed(_)) {
                    warn!(utterance = id.0, "utterance failed");
                }
                self.current = None;
                self.set_speaking(false);
            }
            stale => {
                debug!(?stale, current = ?self.current, "ignoring stale synthesis event");
            }
        }
    }

    fn interrupt(&mut self, engine: &dyn SynthesisEngine) {
        engine.cancel();
        if let Some(previous) = self.current.take() {
            debug!(utterance = previous.0, "utterance cancelled");
        }
        self.set_speaking(false);
    }

    fn set_speaking(&mut self, speaking: bool) {
        if self.speaking == speaking {
            return;
        }
        self.speaking = speaking;
        debug!(speaking, "speaking state changed");
        self.listeners.notify(speaking);
        let _ = self.event_tx.send(VoiceEvent::SpeakingChanged { speaking });
    }
}

/// Pick the voice to speak with
///
/// The stored preference wins when the engine offers it. Otherwise prefer an
/// English voice with "natural" in its name, then any English voice.
pub fn resolve_voice(voices: &[VoiceInfo], preferred_id: Option<&str>) -> Option<VoiceInfo> {
    let english = |v: &&VoiceInfo| v.lang.to_lowercase().starts_with("en");

    preferred_id
        .and_then(|id| voices.iter().find(|v| v.id == id))
        .or_else(|| {
            voices
                .iter()
                .filter(english)
                .find(|v| v.name.to_lowercase().contains("natural"))
        })
        .or_else(|| voices.iter().find(english))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::testing::{voice, FakeSynthesizer};
    use crate::settings::MemoryStore;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct Harness {
        synthesis: SynthesisController,
        engine: Arc<FakeSynthesizer>,
        settings: SettingsStore,
        speaking_log: Arc<Mutex<Vec<bool>>>,
        event_rx: broadcast::Receiver<VoiceEvent>,
        _synthesis_rx: mpsc::UnboundedReceiver<SynthesisEvent>,
    }

    fn harness() -> Harness {
        let engine = Arc::new(FakeSynthesizer::default());
        let (tx, synthesis_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = broadcast::channel(16);
        let listeners = SpeakingListeners::new();
        let speaking_log = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&speaking_log);
        listeners.add(move |speaking| log.lock().unwrap().push(speaking));

        let synthesis = SynthesisController::new(
            Some(engine.clone() as Arc<dyn SynthesisEngine>),
            SynthesisSink::new(tx),
            listeners,
            event_tx,
        );
        Harness {
            synthesis,
            engine,
            settings: SettingsStore::load(MemoryStore::new()),
            speaking_log,
            event_rx,
            _synthesis_rx: synthesis_rx,
        }
    }

    #[test]
    fn test_start_and_end_pair_up() {
        let mut h = harness();
        let id = h.synthesis.speak("hello", &h.settings).unwrap();

        h.synthesis.on_event(SynthesisEvent::Started(id));
        assert!(h.synthesis.is_speaking());
        h.synthesis.on_event(SynthesisEvent::Ended(id));
        assert!(!h.synthesis.is_speaking());

        assert_eq!(*h.speaking_log.lock().unwrap(), vec![true, false]);
        assert_eq!(
            h.event_rx.try_recv().unwrap(),
            VoiceEvent::SpeakingChanged { speaking: true }
        );
        assert_eq!(
            h.event_rx.try_recv().unwrap(),
            VoiceEvent::SpeakingChanged { speaking: false }
        );
    }

    #[test]
    fn test_error_clears_speaking() {
        let mut h = harness();
        let id = h.synthesis.speak("hello", &h.settings).unwrap();

        h.synthesis.on_event(SynthesisEvent::Started(id));
        h.synthesis.on_event(SynthesisEvent::Failed(id));

        assert!(!h.synthesis.is_speaking());
        assert_eq!(*h.speaking_log.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_newest_request_cancels_previous() {
        let mut h = harness();
        let first = h.synthesis.speak("first", &h.settings).unwrap();
        h.synthesis.on_event(SynthesisEvent::Started(first));

        let second = h.synthesis.speak("second", &h.settings).unwrap();
        // Cancellation already reported the first utterance as done
        assert!(!h.synthesis.is_speaking());

        // The engine's late callbacks for the first utterance change nothing
        h.synthesis.on_event(SynthesisEvent::Failed(first));
        h.synthesis.on_event(SynthesisEvent::Started(second));
        h.synthesis.on_event(SynthesisEvent::Ended(first));
        assert!(h.synthesis.is_speaking());

        assert_eq!(*h.speaking_log.lock().unwrap(), vec![true, false, true]);
        assert_eq!(h.engine.cancels(), 2);
        assert_eq!(h.engine.spoken_texts(), vec!["first", "second"]);
    }

    #[test]
    fn test_settings_apply_at_call_time() {
        let mut h = harness();
        h.synthesis.speak("before", &h.settings);

        h.settings.set_volume(0.3);
        h.settings.set_rate(1.7);
        h.settings.set_pitch(0.5);
        h.settings.set_preferred_voice(Some("en-1"));
        h.synthesis.speak("after", &h.settings);

        let spoken = h.engine.spoken();
        assert_eq!(spoken[0].volume, 1.0);
        assert_eq!(spoken[0].voice.as_ref().unwrap().id, "en-2");
        assert_eq!(spoken[1].volume, 0.3);
        assert_eq!(spoken[1].rate, 1.7);
        assert_eq!(spoken[1].pitch, 0.5);
        assert_eq!(spoken[1].voice.as_ref().unwrap().id, "en-1");
        assert_eq!(spoken[1].lang, "en-US");
    }

    #[test]
    fn test_speak_without_engine_is_a_noop() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = broadcast::channel(4);
        let mut synthesis =
            SynthesisController::new(None, SynthesisSink::new(tx), SpeakingListeners::new(), event_tx);
        let settings = SettingsStore::load(MemoryStore::new());

        assert!(!synthesis.is_supported());
        assert_eq!(synthesis.speak("hello", &settings), None);
        synthesis.cancel();
        assert!(synthesis.voices().is_empty());
        assert!(event_rx.try_recv().is_err());
    }

    #[test]
    fn test_resolve_voice_preference_order() {
        let voices = vec![
            voice("fr-1", "Amelie Natural", "fr-FR"),
            voice("en-1", "Daniel", "en-GB"),
            voice("en-2", "Samantha Natural", "en-US"),
        ];

        assert_eq!(resolve_voice(&voices, Some("fr-1")).unwrap().id, "fr-1");
        assert_eq!(resolve_voice(&voices, Some("missing")).unwrap().id, "en-2");
        assert_eq!(resolve_voice(&voices, None).unwrap().id, "en-2");
        assert_eq!(resolve_voice(&voices[..2], None).unwrap().id, "en-1");
        assert_eq!(resolve_voice(&voices[..1], None), None);
        assert_eq!(resolve_voice(&[], Some("en-1")), None);
    }
}

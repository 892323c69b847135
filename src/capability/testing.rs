//! In-process fakes for driving the voice core in tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    CapabilityProvider, RecognitionEngine, RecognitionSink, SynthesisEngine, SynthesisSink,
    Utterance, UtteranceId, VoiceInfo,
};
use crate::dispatch::{GenerationError, ResponseGenerator};
use crate::error::{Result, VoiceError};

#[derive(Default)]
pub struct FakeRecognizer {
    starts: AtomicUsize,
    stops: AtomicUsize,
    refuse_start: AtomicBool,
    sink: Mutex<Option<RecognitionSink>>,
}

impl FakeRecognizer {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn refuse_start(&self) {
        self.refuse_start.store(true, Ordering::SeqCst);
    }

    pub fn say(&self, transcript: &str) {
        self.sink().result(transcript, true);
    }

    pub fn say_interim(&self, transcript: &str) {
        self.sink().result(transcript, false);
    }

    pub fn end_session(&self) {
        self.sink().ended();
    }

    pub fn fail(&self, message: &str) {
        self.sink().error(message);
    }

    fn sink(&self) -> RecognitionSink {
        self.sink
            .lock()
            .unwrap()
            .clone()
            .expect("recognizer was never started")
    }
}

impl RecognitionEngine for FakeRecognizer {
    fn start(&self, sink: RecognitionSink) -> Result<()> {
        if self.refuse_start.load(Ordering::SeqCst) {
            return Err(VoiceError::RecognitionFault("microphone unavailable".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeSynthesizer {
    voices: Vec<VoiceInfo>,
    spoken: Mutex<Vec<Utterance>>,
    cancels: AtomicUsize,
    sink: Mutex<Option<SynthesisSink>>,
}

impl Default for FakeSynthesizer {
    fn default() -> Self {
        Self::with_voices(vec![
            voice("fr-1", "Amelie", "fr-FR"),
            voice("en-1", "Daniel", "en-GB"),
            voice("en-2", "Samantha Natural", "en-US"),
        ])
    }
}

impl FakeSynthesizer {
    pub fn with_voices(voices: Vec<VoiceInfo>) -> Self {
        Self {
            voices,
            spoken: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
            sink: Mutex::new(None),
        }
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken().into_iter().map(|u| u.text).collect()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn start(&self, id: UtteranceId) {
        self.sink().started(id);
    }

    pub fn finish(&self, id: UtteranceId) {
        self.sink().ended(id);
    }

    pub fn break_down(&self, id: UtteranceId) {
        self.sink().failed(id);
    }

    fn sink(&self) -> SynthesisSink {
        self.sink
            .lock()
            .unwrap()
            .clone()
            .expect("nothing was spoken yet")
    }
}

impl SynthesisEngine for FakeSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn speak(&self, utterance: Utterance, sink: SynthesisSink) {
        self.spoken.lock().unwrap().push(utterance);
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn voice(id: &str, name: &str, lang: &str) -> VoiceInfo {
    VoiceInfo {
        id: id.to_string(),
        name: name.to_string(),
        lang: lang.to_string(),
    }
}

#[derive(Default)]
pub struct FakeCapabilities {
    pub recognizer: Option<Arc<FakeRecognizer>>,
    pub synthesizer: Option<Arc<FakeSynthesizer>>,
}

impl FakeCapabilities {
    pub fn full() -> Self {
        Self {
            recognizer: Some(Arc::new(FakeRecognizer::default())),
            synthesizer: Some(Arc::new(FakeSynthesizer::default())),
        }
    }

    pub fn recognizer(&self) -> Arc<FakeRecognizer> {
        self.recognizer.clone().expect("no fake recognizer")
    }

    pub fn synthesizer(&self) -> Arc<FakeSynthesizer> {
        self.synthesizer.clone().expect("no fake synthesizer")
    }
}

impl CapabilityProvider for FakeCapabilities {
    fn recognition(&self) -> Option<Arc<dyn RecognitionEngine>> {
        self.recognizer
            .clone()
            .map(|r| r as Arc<dyn RecognitionEngine>)
    }

    fn synthesis(&self) -> Option<Arc<dyn SynthesisEngine>> {
        self.synthesizer
            .clone()
            .map(|s| s as Arc<dyn SynthesisEngine>)
    }
}

/// How a [`ScriptedGenerator`] answers
#[derive(Clone)]
pub enum Script {
    Reply(String),
    Fail,
    Hang,
}

pub struct ScriptedGenerator {
    script: Script,
    commands: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, command: &str) -> std::result::Result<String, GenerationError> {
        self.commands.lock().unwrap().push(command.to_string());
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Fail => Err(GenerationError::Request("upstream returned 500".to_string())),
            Script::Hang => std::future::pending().await,
        }
    }
}

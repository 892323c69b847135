//! Terminal-backed speech capabilities
//!
//! Typed lines on stdin stand in for recognized speech and spoken replies
//! are printed to stdout. Useful for running the daemon on hosts without a
//! speech engine and for poking the gate by hand.
//!
//! Input conventions:
//! - `text` is a final transcript
//! - `~text` is an interim transcript
//! - an empty line ends the current utterance session
//! - EOF is reported as an engine error

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    CapabilityProvider, RecognitionEngine, RecognitionSink, SynthesisEngine, SynthesisSink,
    Utterance, VoiceInfo,
};
use crate::error::{Result, VoiceError};

/// Simulated speaking time per word at rate 1.0
const MS_PER_WORD: f32 = 350.0;
const MIN_UTTERANCE_MS: f32 = 300.0;

const INPUT_CLOSED: &str = "console input closed";

/// Capture state shared with the stdin reader thread
#[derive(Debug, Default)]
struct Capture {
    /// Sink of the live session, if any
    sink: Option<RecognitionSink>,
    /// Input hit EOF or failed; nothing more will ever be read
    closed: bool,
}

/// Recognizer reading transcripts from stdin
#[derive(Default)]
pub struct ConsoleRecognizer {
    capture: Arc<Mutex<Capture>>,
    reader_spawned: AtomicBool,
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_reader(&self) -> Result<()> {
        if self.reader_spawned.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let capture = Arc::clone(&self.capture);
        thread::Builder::new()
            .name("console-recognizer".to_string())
            .spawn(move || {
                info!("console recognizer reading stdin");
                read_lines(std::io::stdin().lock(), &capture);
            })
            .map(|_| ())
            .map_err(|e| {
                self.reader_spawned.store(false, Ordering::SeqCst);
                VoiceError::RecognitionFault(format!("failed to spawn stdin reader: {e}"))
            })
    }
}

/// Feed lines from `input` to whichever session is capturing
fn read_lines(input: impl BufRead, capture: &Mutex<Capture>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "console input read failed");
                break;
            }
        };

        let mut capture = lock(capture);
        let Some(sink) = capture.sink.as_ref() else {
            debug!("not capturing, dropping console input");
            continue;
        };

        let line = line.trim();
        if line.is_empty() {
            // Session over; the adapter decides whether to start another
            if let Some(sink) = capture.sink.take() {
                sink.ended();
            }
        } else if let Some(interim) = line.strip_prefix('~') {
            sink.result(interim.trim(), false);
        } else {
            sink.result(line, true);
        }
    }

    let mut capture = lock(capture);
    capture.closed = true;
    if let Some(sink) = capture.sink.take() {
        sink.error(INPUT_CLOSED);
    }
    info!("console recognizer stopped reading input");
}

impl RecognitionEngine for ConsoleRecognizer {
    fn start(&self, sink: RecognitionSink) -> Result<()> {
        if lock(&self.capture).closed {
            return Err(VoiceError::RecognitionFault(INPUT_CLOSED.to_string()));
        }

        self.spawn_reader()?;
        let mut capture = lock(&self.capture);
        // The reader may have hit EOF while being spawned
        if capture.closed {
            return Err(VoiceError::RecognitionFault(INPUT_CLOSED.to_string()));
        }
        capture.sink = Some(sink);
        debug!("console recognition session started");
        Ok(())
    }

    fn stop(&self) {
        if let Some(sink) = lock(&self.capture).sink.take() {
            sink.ended();
            debug!("console recognition session stopped");
        }
    }
}

/// Synthesizer printing utterances to stdout with simulated duration
#[derive(Default)]
pub struct ConsoleSpeaker {
    current: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleSpeaker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SynthesisEngine for ConsoleSpeaker {
    fn voices(&self) -> Vec<VoiceInfo> {
        vec![
            VoiceInfo {
                id: "console-natural".to_string(),
                name: "Console Natural".to_string(),
                lang: "en-US".to_string(),
            },
            VoiceInfo {
                id: "console-plain".to_string(),
                name: "Console Plain".to_string(),
                lang: "en-GB".to_string(),
            },
        ]
    }

    fn speak(&self, utterance: Utterance, sink: SynthesisSink) {
        let voice = utterance
            .voice
            .as_ref()
            .map_or("default", |v| v.name.as_str());
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "[{voice}] {}", utterance.text);
        let _ = stdout.flush();

        let words = utterance.text.split_whitespace().count() as f32;
        let millis = (words * MS_PER_WORD / utterance.rate).max(MIN_UTTERANCE_MS);
        let duration = Duration::from_millis(millis as u64);
        let id = utterance.id;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            sink.started(id);
            sink.ended(id);
            return;
        };

        let task = runtime.spawn(async move {
            sink.started(id);
            tokio::time::sleep(duration).await;
            sink.ended(id);
        });

        if let Some(previous) = lock(&self.current).replace(task) {
            previous.abort();
        }
    }

    fn cancel(&self) {
        if let Some(task) = lock(&self.current).take() {
            task.abort();
        }
    }
}

/// Console engines selected by configuration
pub struct ConsoleCapabilities {
    recognition: Option<Arc<ConsoleRecognizer>>,
    synthesis: Option<Arc<ConsoleSpeaker>>,
}

impl ConsoleCapabilities {
    pub fn new(recognition: bool, synthesis: bool) -> Self {
        Self {
            recognition: recognition.then(|| Arc::new(ConsoleRecognizer::new())),
            synthesis: synthesis.then(|| Arc::new(ConsoleSpeaker::new())),
        }
    }
}

impl CapabilityProvider for ConsoleCapabilities {
    fn recognition(&self) -> Option<Arc<dyn RecognitionEngine>> {
        self.recognition
            .clone()
            .map(|engine| engine as Arc<dyn RecognitionEngine>)
    }

    fn synthesis(&self) -> Option<Arc<dyn SynthesisEngine>> {
        self.synthesis
            .clone()
            .map(|engine| engine as Arc<dyn SynthesisEngine>)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//! Synthesis controller
//!
//! One logical voice: a new request preempts the current one, settings are
//! read per utterance, and the speaking state is fanned out to listeners.

mod controller;
mod listeners;

pub use controller::{resolve_voice, SynthesisController, UTTERANCE_LANG};
pub use listeners::{ListenerId, SpeakingListeners};

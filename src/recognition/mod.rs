//! Recognition adapter
//!
//! Normalizes engine callbacks into lower-cased transcripts and keeps
//! capture running across utterance boundaries.

mod adapter;
mod transcript;

pub use adapter::{AdapterOutput, RecognitionAdapter};
pub use transcript::Transcript;

//! Normalized transcripts

/// A recognized utterance, lower-cased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// Committed by the engine; interim results may still be revised
    pub is_final: bool,
}

impl Transcript {
    /// Normalize raw engine text
    pub fn new(raw: &str, is_final: bool) -> Self {
        Self {
            text: raw.trim().to_lowercase(),
            is_final,
        }
    }

    pub fn is_interim(&self) -> bool {
        !self.is_final
    }
}

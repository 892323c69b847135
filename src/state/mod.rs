//! Wake-word gate and session state
//!
//! The gate has three states:
//! - Idle: waiting for the wake word
//! - Armed: wake word heard, the next final transcript is the command
//! - Disabled: wake-word checking off, every final transcript is a command

mod machine;
mod session;

pub use machine::{contains_wake_word, GateAction, GateState, WakeWordGate, WindowId};
pub use session::VoiceSession;

//! aura-voice: hands-free voice interaction controller
//!
//! Continuous speech recognition feeds a wake-word gate; accepted commands go
//! to a response generator and replies are spoken back through a single
//! synthesis channel. Everything runs on one controller task reachable
//! through a cloneable [`controller::ControllerHandle`].

pub mod capability;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod recognition;
pub mod settings;
pub mod state;
pub mod synthesis;

pub use controller::{ControllerHandle, VoiceController};
pub use error::{Result, VoiceError};

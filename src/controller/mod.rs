//! Voice interaction controller
//!
//! Recognition adapter → wake-word gate → command dispatcher → synthesis,
//! driven by a single event loop with a cloneable handle for the outside.

#[allow(clippy::module_inception)]
mod controller;
mod handle;

pub use controller::{
    VoiceController, ACKNOWLEDGEMENT, COMMAND_WINDOW, RECOGNITION_START_FAILED,
    RECOGNITION_STOPPED, RECOGNITION_UNSUPPORTED,
};
pub use handle::{ControllerHandle, GateMode, VoiceStatus};

//! Per-controller session state

use tokio::task::JoinHandle;
use tracing::debug;

use super::machine::{GateState, WakeWordGate, WindowId};

/// Outstanding deadline for an armed window
#[derive(Debug)]
struct PendingDeadline {
    window: WindowId,
    task: JoinHandle<()>,
}

/// Mutable state threaded through the controller's event loop
///
/// A deadline is pending exactly while the gate is armed, and it belongs to
/// the armed window.
#[derive(Debug)]
pub struct VoiceSession {
    /// Continuous recognition is active
    pub listening: bool,
    /// Synthesis is producing audio
    pub speaking: bool,
    gate: WakeWordGate,
    pending: Option<PendingDeadline>,
}

impl VoiceSession {
    pub fn new(wake_word_enabled: bool) -> Self {
        Self {
            listening: false,
            speaking: false,
            gate: WakeWordGate::new(wake_word_enabled),
            pending: None,
        }
    }

    pub fn gate(&self) -> &WakeWordGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut WakeWordGate {
        &mut self.gate
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// The gate is open for a command
    pub fn waiting_for_command(&self) -> bool {
        self.gate.is_armed()
    }

    /// Track the timer for `window`, cancelling any previous one
    pub fn set_deadline(&mut self, window: WindowId, task: JoinHandle<()>) {
        self.cancel_deadline();
        self.pending = Some(PendingDeadline { window, task });
    }

    /// Abort the outstanding timer, if any
    pub fn cancel_deadline(&mut self) -> Option<WindowId> {
        let pending = self.pending.take()?;
        pending.task.abort();
        debug!(window = pending.window.0, "deadline cancelled");
        Some(pending.window)
    }

    /// Forget the timer for `window` after it fired
    pub fn deadline_fired(&mut self, window: WindowId) {
        if self.pending.as_ref().is_some_and(|p| p.window == window) {
            self.pending = None;
        }
    }

    pub fn has_pending_deadline(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline and gate agree
    pub fn is_consistent(&self) -> bool {
        match (self.gate.state(), &self.pending) {
            (GateState::Armed(window), Some(pending)) => pending.window == window,
            (GateState::Armed(_), None) | (_, Some(_)) => false,
            (_, None) => true,
        }
    }
}

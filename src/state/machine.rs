//! Wake-word gate state machine
//!
//! Decides whether a final transcript is addressed to the assistant.
//! Moves between Idle, Armed (wake word heard, waiting for the command)
//! and Disabled (wake-word checking off, every utterance is a command).
//! Timers live with the controller; the gate only hands out window ids
//! and checks them when a deadline reports back.

use std::time::Instant;

use tracing::{debug, info};

/// Identifies one armed command window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// The three gate states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Listening for the wake word
    Idle,
    /// Wake word heard, the next final transcript is the command
    Armed(WindowId),
    /// Wake-word checking is off
    Disabled,
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateState::Idle => write!(f, "Idle"),
            GateState::Armed(WindowId(id)) => write!(f, "Armed(#{id})"),
            GateState::Disabled => write!(f, "Disabled"),
        }
    }
}

/// What the controller should do after a final transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    /// Not addressed to the assistant
    Ignore,
    /// Wake word heard: acknowledge and start the deadline for this window
    Arm(WindowId),
    /// Send this text to the command dispatcher; `closed` is the window it consumed
    Dispatch {
        command: String,
        closed: Option<WindowId>,
    },
}

/// Wake-word gate
#[derive(Debug)]
pub struct WakeWordGate {
    state: GateState,
    next_window: u64,
    state_entered_at: Option<Instant>,
}

impl WakeWordGate {
    /// Create a gate, Idle when checking is enabled and Disabled otherwise
    pub fn new(wake_word_enabled: bool) -> Self {
        Self {
            state: if wake_word_enabled {
                GateState::Idle
            } else {
                GateState::Disabled
            },
            next_window: 0,
            state_entered_at: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// True while a command window is open
    pub fn is_armed(&self) -> bool {
        matches!(self.state, GateState::Armed(_))
    }

    /// Feed one final transcript through the gate
    pub fn on_final(&mut self, transcript: &str, wake_word: &str) -> GateAction {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            debug!("ignoring blank transcript");
            return GateAction::Ignore;
        }

        match self.state {
            GateState::Idle => {
                if contains_wake_word(transcript, wake_word) {
                    let window = self.open_window();
                    info!(wake_word, transcript, "wake word detected");
                    GateAction::Arm(window)
                } else {
                    debug!(transcript, "no wake word, ignoring");
                    GateAction::Ignore
                }
            }
            GateState::Armed(window) => {
                self.transition_to(GateState::Idle);
                GateAction::Dispatch {
                    command: transcript.to_string(),
                    closed: Some(window),
                }
            }
            GateState::Disabled => GateAction::Dispatch {
                command: transcript.to_string(),
                closed: None,
            },
        }
    }

    /// A deadline fired; returns true if it closed the live window
    ///
    /// Deadlines for windows that were already consumed or superseded are
    /// stale and change nothing.
    pub fn on_deadline(&mut self, window: WindowId) -> bool {
        if self.state == GateState::Armed(window) {
            info!(window = window.0, "no command before deadline, back to idle");
            self.transition_to(GateState::Idle);
            true
        } else {
            debug!(window = window.0, state = %self.state, "ignoring stale deadline");
            false
        }
    }

    /// Follow the wake-word setting; returns the window closed by the change
    pub fn set_enabled(&mut self, enabled: bool) -> Option<WindowId> {
        let closed = self.armed_window();
        let target = if enabled {
            match self.state {
                GateState::Disabled => GateState::Idle,
                other => other,
            }
        } else {
            GateState::Disabled
        };

        if target != self.state {
            self.transition_to(target);
        }
        closed.filter(|_| !self.is_armed())
    }

    /// Close any open window without dispatching
    pub fn reset(&mut self) -> Option<WindowId> {
        let closed = self.armed_window();
        if closed.is_some() {
            self.transition_to(GateState::Idle);
        }
        closed
    }

    fn armed_window(&self) -> Option<WindowId> {
        match self.state {
            GateState::Armed(window) => Some(window),
            _ => None,
        }
    }

    fn open_window(&mut self) -> WindowId {
        self.next_window += 1;
        let window = WindowId(self.next_window);
        self.transition_to(GateState::Armed(window));
        window
    }

    fn transition_to(&mut self, new_state: GateState) {
        let duration_ms = self
            .state_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(from = %self.state, to = %new_state, duration_ms, "gate transition");

        self.state = new_state;
        self.state_entered_at = Some(Instant::now());
    }
}

/// Case-insensitive substring match; words may be embedded in longer phrases
pub fn contains_wake_word(transcript: &str, wake_word: &str) -> bool {
    let wake_word = wake_word.trim().to_lowercase();
    !wake_word.is_empty() && transcript.to_lowercase().contains(&wake_word)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAKE: &str = "hey aura";

    fn dispatched(command: &str, closed: Option<WindowId>) -> GateAction {
        GateAction::Dispatch {
            command: command.to_string(),
            closed,
        }
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(WakeWordGate::new(true).state(), GateState::Idle);
        assert_eq!(WakeWordGate::new(false).state(), GateState::Disabled);
    }

    #[test]
    fn test_idle_arms_only_on_wake_word() {
        let cases = [
            ("hey aura", true),
            ("HEY AURA what's up", true),
            ("can you hey aura please", true),
            ("theyhey aurax", true),
            ("hey", false),
            ("aura hey", false),
            ("what's the weather", false),
        ];

        for (transcript, arms) in cases {
            let mut gate = WakeWordGate::new(true);
            let action = gate.on_final(transcript, WAKE);
            assert_eq!(matches!(action, GateAction::Arm(_)), arms, "{transcript}");
            assert_eq!(gate.is_armed(), arms, "{transcript}");
        }
    }

    #[test]
    fn test_idle_ignores_other_speech() {
        let mut gate = WakeWordGate::new(true);
        assert_eq!(gate.on_final("turn on the lights", WAKE), GateAction::Ignore);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_armed_dispatches_next_final() {
        let mut gate = WakeWordGate::new(true);
        let GateAction::Arm(window) = gate.on_final("can you hey aura please", WAKE) else {
            panic!("expected to arm");
        };

        assert_eq!(
            gate.on_final("what's the weather", WAKE),
            dispatched("what's the weather", Some(window))
        );
        assert_eq!(gate.state(), GateState::Idle);

        // Later speech without the wake word goes nowhere
        assert_eq!(gate.on_final("and tomorrow?", WAKE), GateAction::Ignore);
    }

    #[test]
    fn test_armed_consumes_wake_word_phrase_as_command() {
        let mut gate = WakeWordGate::new(true);
        let GateAction::Arm(window) = gate.on_final("hey aura", WAKE) else {
            panic!("expected to arm");
        };
        assert_eq!(
            gate.on_final("hey aura stop", WAKE),
            dispatched("hey aura stop", Some(window))
        );
    }

    #[test]
    fn test_deadline_closes_live_window() {
        let mut gate = WakeWordGate::new(true);
        let GateAction::Arm(window) = gate.on_final("hey aura", WAKE) else {
            panic!("expected to arm");
        };

        assert!(gate.on_deadline(window));
        assert_eq!(gate.state(), GateState::Idle);
        assert!(!gate.on_deadline(window));
    }

    #[test]
    fn test_stale_deadline_is_ignored() {
        let mut gate = WakeWordGate::new(true);
        let GateAction::Arm(first) = gate.on_final("hey aura", WAKE) else {
            panic!("expected to arm");
        };
        gate.on_final("play music", WAKE);

        let GateAction::Arm(second) = gate.on_final("hey aura", WAKE) else {
            panic!("expected to arm again");
        };
        assert_ne!(first, second);

        assert!(!gate.on_deadline(first));
        assert_eq!(gate.state(), GateState::Armed(second));
    }

    #[test]
    fn test_disabled_dispatches_everything() {
        let mut gate = WakeWordGate::new(false);
        assert_eq!(gate.on_final("open the door", WAKE), dispatched("open the door", None));
        assert_eq!(gate.on_final("hey aura", WAKE), dispatched("hey aura", None));
        assert_eq!(gate.state(), GateState::Disabled);
    }

    #[test]
    fn test_blank_transcripts_are_ignored() {
        let mut gate = WakeWordGate::new(false);
        assert_eq!(gate.on_final("   ", WAKE), GateAction::Ignore);
    }

    #[test]
    fn test_disabling_closes_window() {
        let mut gate = WakeWordGate::new(true);
        let GateAction::Arm(window) = gate.on_final("hey aura", WAKE) else {
            panic!("expected to arm");
        };

        assert_eq!(gate.set_enabled(false), Some(window));
        assert_eq!(gate.state(), GateState::Disabled);
        assert_eq!(gate.set_enabled(true), None);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_enabling_keeps_open_window() {
        let mut gate = WakeWordGate::new(true);
        gate.on_final("hey aura", WAKE);
        assert_eq!(gate.set_enabled(true), None);
        assert!(gate.is_armed());
    }

    #[test]
    fn test_reset() {
        let mut gate = WakeWordGate::new(true);
        assert_eq!(gate.reset(), None);

        let GateAction::Arm(window) = gate.on_final("hey aura", WAKE) else {
            panic!("expected to arm");
        };
        assert_eq!(gate.reset(), Some(window));
        assert_eq!(gate.state(), GateState::Idle);

        let mut disabled = WakeWordGate::new(false);
        assert_eq!(disabled.reset(), None);
        assert_eq!(disabled.state(), GateState::Disabled);
    }

    #[test]
    fn test_wake_word_match_is_case_insensitive() {
        assert!(contains_wake_word("Hey Aura!", "HEY AURA"));
        assert!(!contains_wake_word("anything", "  "));
    }
}

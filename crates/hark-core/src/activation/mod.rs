//! Gesture detection: raw key events in, recording commands out.

mod machine;
mod timer;

use std::time::Instant;

pub use machine::{ActivationConfig, ActivationMachine, SessionView};

/// Raw key events delivered by the OS adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// The latching toggle key went down.
    TogglePressed,
    /// The cancel key went down.
    CancelPressed,
    /// The clear-buffer key went down.
    ClearPressed,
}

/// Commands the machine issues to its owning controller. The machine itself
/// never touches audio or network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartDictation,
    /// Stop dictation and process the captured audio.
    StopDictation,
    /// Stop dictation and discard the captured audio.
    CancelDictation,
    /// Discard buffered audio but keep capturing.
    ClearDictationBuffer,
    /// Start or stop the meeting recording session.
    ToggleMeeting,
}

/// Gesture classification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    LatchOn,
    LatchOff,
    Cancel,
}

/// A timestamped gesture classification.
#[derive(Debug, Clone, Copy)]
pub struct ActivationEvent {
    pub kind: ActivationKind,
    pub observed_at: Instant,
}

/// Authoritative query for the physical latched state of the toggle key,
/// independent of the key-event stream.
pub trait LatchProbe {
    fn is_latched(&self) -> bool;
}

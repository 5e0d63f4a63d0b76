//! Inputs to the state machine that are not address changes.

use std::fmt;

use snowball_core::ids::SectionId;

/// Something the subject asked for through the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    /// Follow the section's default transition.
    Continue,
    /// Pick one of a decision section's transitions, by position.
    Choose(usize),
    /// Submit an answer to the current riddle.
    Answer(String),
}

/// A change requested through the shared record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// The record knows a further step than this device.
    AdoptMaxStep(u32),
    /// The administrator opened the gate.
    UnlockGate,
    /// Move the subject to a section.
    Teleport(SectionId),
    /// The record was deleted; start over.
    Reset,
}

impl RemoteCommand {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AdoptMaxStep(_) => "adopt_max_step",
            Self::UnlockGate => "unlock_gate",
            Self::Teleport(_) => "teleport",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdoptMaxStep(step) => write!(f, "adopt_max_step({step})"),
            Self::Teleport(section) => write!(f, "teleport({section})"),
            other => f.write_str(other.name()),
        }
    }
}

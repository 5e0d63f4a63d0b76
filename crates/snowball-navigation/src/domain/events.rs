//! Domain events recorded by the navigation machine.

use serde::{Deserialize, Serialize};
use snowball_core::event::{DomainEvent, EventMetadata};
use snowball_core::ids::SectionId;
use snowball_story::Branch;

/// Why a requested section was not the one shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// The id is not in the graph.
    UnknownSection,
    /// The section is more than one step beyond the furthest step.
    BeyondReach,
    /// The section lies past the gate, which is still closed.
    GateClosed,
}

/// Emitted when a section is put on screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionEntered {
    pub section: SectionId,
    pub step: u32,
    pub branch: Branch,
    /// Whether entering advanced the furthest step.
    pub advanced: bool,
}

/// Emitted when a request lands somewhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redirected {
    /// Raw requested id, which may not be a known section.
    pub requested: String,
    pub landed: SectionId,
    pub reason: RedirectReason,
}

/// Emitted when the gated section's way forward is shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRevealed {
    pub section: SectionId,
}

/// Emitted when the shared record was deleted and the session restarted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReset {
    pub landed: SectionId,
}

/// Event type identifier for [`SectionEntered`].
pub const SECTION_ENTERED_EVENT_TYPE: &str = "navigation.section_entered";

/// Event type identifier for [`Redirected`].
pub const REDIRECTED_EVENT_TYPE: &str = "navigation.redirected";

/// Event type identifier for [`GateRevealed`].
pub const GATE_REVEALED_EVENT_TYPE: &str = "navigation.gate_revealed";

/// Event type identifier for [`ProgressReset`].
pub const PROGRESS_RESET_EVENT_TYPE: &str = "navigation.progress_reset";

/// Event payload variants for navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NavigationEventKind {
    SectionEntered(SectionEntered),
    Redirected(Redirected),
    GateRevealed(GateRevealed),
    ProgressReset(ProgressReset),
}

/// Domain event envelope for navigation.
#[derive(Debug, Clone)]
pub struct NavigationEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: NavigationEventKind,
}

impl DomainEvent for NavigationEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            NavigationEventKind::SectionEntered(_) => SECTION_ENTERED_EVENT_TYPE,
            NavigationEventKind::Redirected(_) => REDIRECTED_EVENT_TYPE,
            NavigationEventKind::GateRevealed(_) => GATE_REVEALED_EVENT_TYPE,
            NavigationEventKind::ProgressReset(_) => PROGRESS_RESET_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap_or(serde_json::Value::Null)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

//! Persisted progress shapes: the shared record, merge patches and
//! riddle attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SectionId;

/// The single shared progress document.
///
/// Absence of the document is a valid state (a fresh subject); every
/// field therefore has a default matching that implicit initial state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Furthest step ever reached. Never decreases except by deletion.
    #[serde(default)]
    pub max_step_reached: u32,
    /// Section the subject is currently viewing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_section: Option<SectionId>,
    /// Set by the administrator to open the gate early.
    #[serde(default)]
    pub gate_unlocked: bool,
    /// Time of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Identity of the last writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// A merge-write against [`ProgressRecord`]. `None` fields are left
/// untouched by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    /// New furthest step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_step_reached: Option<u32>,
    /// New current section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_section: Option<SectionId>,
    /// Gate flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_unlocked: Option<bool>,
    /// Write timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Writer identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl ProgressPatch {
    /// Patch advancing the furthest step and the current section together.
    #[must_use]
    pub fn step(step: u32, section: Option<SectionId>, at: DateTime<Utc>, by: Option<String>) -> Self {
        Self {
            max_step_reached: Some(step),
            current_section: section,
            last_updated: Some(at),
            updated_by: by,
            ..Self::default()
        }
    }

    /// Patch moving only the current section.
    #[must_use]
    pub fn location(section: SectionId, at: DateTime<Utc>, by: Option<String>) -> Self {
        Self {
            current_section: Some(section),
            last_updated: Some(at),
            updated_by: by,
            ..Self::default()
        }
    }

    /// Patch opening the gate.
    #[must_use]
    pub fn gate_unlock(at: DateTime<Utc>, by: Option<String>) -> Self {
        Self {
            gate_unlocked: Some(true),
            last_updated: Some(at),
            updated_by: by,
            ..Self::default()
        }
    }

    /// Returns `true` when the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the patch into `record`, creating fields as needed.
    pub fn apply_to(&self, record: &mut ProgressRecord) {
        if let Some(step) = self.max_step_reached {
            record.max_step_reached = step;
        }
        if let Some(section) = &self.current_section {
            record.current_section = Some(section.clone());
        }
        if let Some(unlocked) = self.gate_unlocked {
            record.gate_unlocked = unlocked;
        }
        if let Some(at) = self.last_updated {
            record.last_updated = Some(at);
        }
        if let Some(by) = &self.updated_by {
            record.updated_by = Some(by.clone());
        }
    }
}

/// One entry of the append-only riddle attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEntry {
    /// Riddle key the answer was given for.
    pub riddle_id: String,
    /// Answer exactly as typed.
    pub raw_answer_text: String,
    /// Whether the answer was accepted.
    pub is_correct: bool,
    /// When the answer was submitted.
    pub timestamp: DateTime<Utc>,
}

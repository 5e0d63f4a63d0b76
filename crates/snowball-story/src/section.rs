//! Section and manifest model.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snowball_core::ids::SectionId;

/// Mutually exclusive narrative paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Shared prefix every subject walks.
    Common,
    /// Early-exit path.
    Fast,
    /// Long path through the riddles, the gate and the finale.
    Patient,
}

impl Branch {
    /// Returns `true` for the shared prefix.
    #[must_use]
    pub fn is_common(self) -> bool {
        self == Self::Common
    }

    /// Returns `true` if a section on `self` may be shown as visited for
    /// a subject committed to `active`.
    #[must_use]
    pub fn visible_on(self, active: Option<Self>) -> bool {
        self.is_common() || Some(self) == active
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Common => "common",
            Self::Fast => "fast",
            Self::Patient => "patient",
        })
    }
}

/// What a section is, as far as the renderer is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Intro,
    Decision,
    Riddle,
    Explanation,
    Video,
    Countdown,
}

/// A candidate forward move out of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Section the move leads to.
    pub target: SectionId,
    /// Button label shown by the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// When set, the target's narration is not replayed on arrival.
    #[serde(default)]
    pub skips_narration: bool,
}

/// Opaque data handed to the renderer and the audio collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    /// Key into the manifest's answer table (riddles only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riddle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
}

/// One narrative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub step: u32,
    pub branch: Branch,
    pub kind: SectionKind,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Forward move blocked until the gate opens.
    #[serde(default)]
    pub gated: bool,
    #[serde(default)]
    pub presentation: Presentation,
}

impl Section {
    /// Sections without a way forward end the experience.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }

    /// The default forward move (first transition).
    #[must_use]
    pub fn next(&self) -> Option<&Transition> {
        self.transitions.first()
    }
}

/// Top-level shape of a story manifest file.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryManifest {
    /// First section of a fresh subject.
    pub start: SectionId,
    /// Branch whose sections answer step reverse lookups.
    pub canonical_branch: Branch,
    /// Real-world time at which the gate opens on its own.
    #[serde(default)]
    pub unlock_at: Option<DateTime<Utc>>,
    /// Target instant shown by the countdown display.
    #[serde(default)]
    pub countdown_at: Option<DateTime<Utc>>,
    /// Accepted answers per riddle key.
    #[serde(default)]
    pub answers: BTreeMap<String, Vec<String>>,
    pub sections: Vec<Section>,
}

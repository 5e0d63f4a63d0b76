//! The validated section graph and its lookups.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use snowball_core::ids::SectionId;
use tracing::{debug, info};

use crate::error::StoryError;
use crate::section::{Branch, Section, SectionKind, StoryManifest};

const BUILTIN_MANIFEST: &str = include_str!("../story.yaml");

/// Immutable lookup structure over every section of the story.
#[derive(Debug, Clone)]
pub struct SectionGraph {
    sections: Vec<Section>,
    index: HashMap<SectionId, usize>,
    start: usize,
    canonical_branch: Branch,
    unlock_at: Option<DateTime<Utc>>,
    countdown_at: Option<DateTime<Utc>>,
    answers: BTreeMap<String, Vec<String>>,
}

impl SectionGraph {
    /// Loads the narrative shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `StoryError` if the embedded manifest is invalid.
    pub fn builtin() -> Result<Self, StoryError> {
        Self::from_yaml(BUILTIN_MANIFEST)
    }

    /// Loads the manifest at `path`, or the built-in one when `None`.
    ///
    /// # Errors
    ///
    /// Returns `StoryError::Io` if the file cannot be read, or a
    /// validation error if its content is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, StoryError> {
        let Some(path) = path else {
            return Self::builtin();
        };
        let raw = std::fs::read_to_string(path).map_err(|source| StoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loading story manifest");
        Self::from_yaml(&raw)
    }

    /// Parses and validates a YAML manifest.
    ///
    /// # Errors
    ///
    /// Returns `StoryError::Parse` for malformed YAML, or a validation
    /// error for structural problems.
    pub fn from_yaml(raw: &str) -> Result<Self, StoryError> {
        let manifest: StoryManifest = serde_yaml::from_str(raw)?;
        Self::from_manifest(manifest)
    }

    /// Validates a parsed manifest and builds the lookup indexes.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn from_manifest(manifest: StoryManifest) -> Result<Self, StoryError> {
        let mut index = HashMap::with_capacity(manifest.sections.len());
        for (position, section) in manifest.sections.iter().enumerate() {
            if index.insert(section.id.clone(), position).is_some() {
                return Err(StoryError::DuplicateSection(section.id.to_string()));
            }
        }

        let start = *index
            .get(&manifest.start)
            .ok_or_else(|| StoryError::UnknownStart(manifest.start.to_string()))?;

        let mut gated: Option<&Section> = None;
        let mut steps: HashMap<(Branch, u32), &Section> = HashMap::new();
        for section in &manifest.sections {
            for transition in &section.transitions {
                if !index.contains_key(&transition.target) {
                    return Err(StoryError::DanglingTransition {
                        from: section.id.to_string(),
                        to: transition.target.to_string(),
                    });
                }
            }
            if section.gated {
                if let Some(first) = gated {
                    return Err(StoryError::MultipleGates {
                        first: first.id.to_string(),
                        second: section.id.to_string(),
                    });
                }
                gated = Some(section);
            }
            if let Some(first) = steps.insert((section.branch, section.step), section) {
                return Err(StoryError::StepCollision {
                    step: section.step,
                    first: first.id.to_string(),
                    second: section.id.to_string(),
                });
            }
            if section.kind == SectionKind::Riddle
                && section.presentation.riddle.as_deref().is_none_or(str::is_empty)
            {
                return Err(StoryError::MissingRiddleKey(section.id.to_string()));
            }
        }

        debug!(sections = manifest.sections.len(), "story manifest validated");

        Ok(Self {
            sections: manifest.sections,
            index,
            start,
            canonical_branch: manifest.canonical_branch,
            unlock_at: manifest.unlock_at,
            countdown_at: manifest.countdown_at,
            answers: manifest.answers,
        })
    }

    /// Looks a section up by id.
    #[must_use]
    pub fn get(&self, id: &SectionId) -> Option<&Section> {
        self.index.get(id).map(|&position| &self.sections[position])
    }

    /// Looks a section up by its raw id (e.g. an address fragment).
    #[must_use]
    pub fn find(&self, raw: &str) -> Option<&Section> {
        self.get(&SectionId::from(raw))
    }

    /// The manifest's first section.
    #[must_use]
    pub fn start(&self) -> &Section {
        &self.sections[self.start]
    }

    /// The section sitting at `step` on the common prefix or the
    /// canonical branch.
    #[must_use]
    pub fn section_for_step(&self, step: u32) -> Option<&Section> {
        self.sections.iter().find(|section| {
            section.step == step
                && (section.branch.is_common() || section.branch == self.canonical_branch)
        })
    }

    /// Like [`Self::section_for_step`] but prefers `branch`, so a subject
    /// on a side branch falls back onto its own path.
    #[must_use]
    pub fn section_for_step_on(&self, step: u32, branch: Option<Branch>) -> Option<&Section> {
        branch
            .and_then(|branch| {
                self.sections
                    .iter()
                    .find(|section| section.step == step && section.branch == branch)
            })
            .or_else(|| self.section_for_step(step))
    }

    /// The single gated section, if the story has one.
    #[must_use]
    pub fn gated_section(&self) -> Option<&Section> {
        self.sections.iter().find(|section| section.gated)
    }

    /// Branch membership of `id`.
    #[must_use]
    pub fn branch_of(&self, id: &SectionId) -> Option<Branch> {
        self.get(id).map(|section| section.branch)
    }

    /// Every section in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Instant at which the gate opens without administrator help.
    #[must_use]
    pub fn unlock_at(&self) -> Option<DateTime<Utc>> {
        self.unlock_at
    }

    /// Target instant for the countdown display.
    #[must_use]
    pub fn countdown_at(&self) -> Option<DateTime<Utc>> {
        self.countdown_at
    }

    /// Accepted answers for a riddle key; empty when unknown.
    #[must_use]
    pub fn accepted_answers(&self, riddle: &str) -> &[String] {
        self.answers
            .get(riddle)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Sections to mark visited for a subject committed to `active`
    /// (`None` when no branch has been taken) with `max_step` reached.
    ///
    /// Branch membership, not the step number alone, decides: a section
    /// of another branch is never visited even when its step is covered.
    #[must_use]
    pub fn visited_sections(&self, active: Option<Branch>, max_step: u32) -> Vec<&SectionId> {
        self.sections
            .iter()
            .filter(|section| section.step <= max_step && section.branch.visible_on(active))
            .map(|section| &section.id)
            .collect()
    }
}

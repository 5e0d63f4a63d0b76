//! Progress path view for the administrator's viewer.

use serde::Serialize;
use snowball_core::ids::SectionId;

use crate::graph::SectionGraph;
use crate::section::Branch;

/// Display status of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Current,
    Visited,
    Locked,
}

/// One section in the path view.
#[derive(Debug, Clone, Serialize)]
pub struct PathEntry {
    pub id: SectionId,
    pub title: Option<String>,
    pub step: u32,
    pub status: StepStatus,
}

/// The sections of one branch, in declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct BranchPath {
    pub branch: Branch,
    pub entries: Vec<PathEntry>,
}

/// Every branch of the story with per-section status.
#[derive(Debug, Clone, Serialize)]
pub struct PathView {
    /// Branch the subject is on, derived from the current section.
    pub active_branch: Option<Branch>,
    pub branches: Vec<BranchPath>,
}

const BRANCH_ORDER: [Branch; 3] = [Branch::Common, Branch::Fast, Branch::Patient];

impl SectionGraph {
    /// Builds the viewer's path for a subject at `current` with
    /// `max_step` reached.
    #[must_use]
    pub fn path_view(&self, current: Option<&SectionId>, max_step: u32) -> PathView {
        let active_branch = current
            .and_then(|id| self.branch_of(id))
            .filter(|branch| !branch.is_common());
        let visited = self.visited_sections(active_branch, max_step);

        let branches = BRANCH_ORDER
            .iter()
            .map(|&branch| BranchPath {
                branch,
                entries: self
                    .sections()
                    .filter(|section| section.branch == branch)
                    .map(|section| {
                        let status = if current == Some(&section.id) {
                            StepStatus::Current
                        } else if visited.contains(&&section.id) {
                            StepStatus::Visited
                        } else {
                            StepStatus::Locked
                        };
                        PathEntry {
                            id: section.id.clone(),
                            title: section.presentation.title.clone(),
                            step: section.step,
                            status,
                        }
                    })
                    .collect(),
            })
            .collect();

        PathView {
            active_branch,
            branches,
        }
    }
}

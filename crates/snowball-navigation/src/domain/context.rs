//! Mutable state owned by the navigation machine.

use serde::Serialize;
use snowball_core::ids::SectionId;
use snowball_story::{Branch, Section, SectionKind};
use tokio::task::AbortHandle;

/// Background music the audio collaborator should be playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundTrack {
    #[default]
    Silent,
    Main,
    Final,
}

impl BackgroundTrack {
    /// Track that belongs under `section`.
    #[must_use]
    pub fn for_section(section: &Section) -> Self {
        match section.kind {
            SectionKind::Countdown => Self::Final,
            SectionKind::Intro | SectionKind::Video => Self::Silent,
            _ => Self::Main,
        }
    }
}

/// Everything the machine knows about the running session.
#[derive(Debug, Default)]
pub struct NavigationContext {
    /// Section on screen; `None` before the first render.
    pub(crate) current: Option<SectionId>,
    /// Furthest step reached as far as this session knows.
    pub(crate) max_step: u32,
    /// Side branch the subject entered, if any.
    pub(crate) committed_branch: Option<Branch>,
    /// Gate flag from the shared record.
    pub(crate) gate_unlocked: bool,
    /// The gated section's way forward has been shown this session.
    pub(crate) gate_revealed: bool,
    pub(crate) background: BackgroundTrack,
    /// Bumped on every section entry; stale timer signals carry an old value.
    pub(crate) visit_epoch: u64,
    pub(crate) gate_watch: Option<AbortHandle>,
    pub(crate) countdown_running: bool,
    /// Set by a transition that suppresses the next narration.
    pub(crate) skip_next_narration: bool,
}

impl NavigationContext {
    /// Context seeded from reconciled progress.
    #[must_use]
    #[allow(clippy::field_reassign_with_default)] // struct-update syntax cannot move out of a `Drop` type
    pub fn new(max_step: u32, gate_unlocked: bool) -> Self {
        let mut context = Self::default();
        context.max_step = max_step;
        context.gate_unlocked = gate_unlocked;
        context
    }

    #[must_use]
    pub fn current(&self) -> Option<&SectionId> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn max_step(&self) -> u32 {
        self.max_step
    }

    #[must_use]
    pub fn committed_branch(&self) -> Option<Branch> {
        self.committed_branch
    }

    #[must_use]
    pub fn gate_unlocked(&self) -> bool {
        self.gate_unlocked
    }

    #[must_use]
    pub fn gate_revealed(&self) -> bool {
        self.gate_revealed
    }

    #[must_use]
    pub fn background(&self) -> BackgroundTrack {
        self.background
    }

    #[must_use]
    pub fn visit_epoch(&self) -> u64 {
        self.visit_epoch
    }

    /// Whether a periodic gate re-check is scheduled.
    #[must_use]
    pub fn gate_watch_active(&self) -> bool {
        self.gate_watch
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    #[must_use]
    pub fn countdown_running(&self) -> bool {
        self.countdown_running
    }

    /// Gate counts as open for navigation purposes.
    #[must_use]
    pub fn gate_open(&self) -> bool {
        self.gate_unlocked || self.gate_revealed
    }

    pub(crate) fn cancel_gate_watch(&mut self) {
        if let Some(handle) = self.gate_watch.take() {
            handle.abort();
        }
    }

    /// Forgets all progress, keeping only what is on screen.
    pub(crate) fn reset_progress(&mut self) {
        self.cancel_gate_watch();
        self.max_step = 0;
        self.committed_branch = None;
        self.gate_unlocked = false;
        self.gate_revealed = false;
    }
}

impl Drop for NavigationContext {
    fn drop(&mut self) {
        self.cancel_gate_watch();
    }
}

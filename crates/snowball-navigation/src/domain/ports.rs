//! Collaborators the machine drives but does not implement.

use chrono::{DateTime, Utc};
use snowball_core::ids::SectionId;
use snowball_story::{Branch, Section};

use crate::domain::context::BackgroundTrack;

/// Session facts handed to the renderer with each section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame {
    pub max_step: u32,
    pub branch: Option<Branch>,
    /// Sections to mark visited in the progress display.
    pub visited: Vec<SectionId>,
    /// The gate's way forward is already available.
    pub gate_revealed: bool,
}

/// Visual side of the experience.
pub trait SectionRenderer: Send {
    /// Hides the current section before a change.
    fn fade_out(&mut self);

    /// Shows `section`.
    fn render(&mut self, section: &Section, frame: &RenderFrame);

    /// Makes the gated section's continue action available.
    fn reveal_continue(&mut self, section: &SectionId);

    /// Tells the subject an answer was not accepted.
    fn reject_answer(&mut self, section: &SectionId);

    fn start_countdown(&mut self, target: Option<DateTime<Utc>>);

    fn stop_countdown(&mut self);

    /// Warms up assets of sections likely to come next.
    fn preload(&mut self, _assets: &[String]) {}
}

/// Audio side of the experience.
pub trait NarrationPlayer: Send {
    fn stop_narration(&mut self);

    fn play_narration(&mut self, asset: &str);

    /// Fades over to `track`. Only called when the track changes.
    fn switch_background(&mut self, track: BackgroundTrack);
}

/// Decides whether a riddle answer is acceptable.
pub trait AnswerJudge: Send + Sync {
    fn is_correct(&self, riddle: &str, answer: &str) -> bool;
}

/// The address the subject can see and edit, as a `#<section>` fragment.
pub trait AddressBar: Send {
    /// Current fragment without the leading `#`, `None` when empty.
    fn fragment(&self) -> Option<String>;

    /// Adds a history entry.
    fn push(&mut self, fragment: &str);

    /// Overwrites the current history entry.
    fn replace(&mut self, fragment: &str);
}

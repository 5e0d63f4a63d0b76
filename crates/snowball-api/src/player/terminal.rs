//! Line-oriented terminal collaborators for the player.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use snowball_core::clock::Clock;
use snowball_core::ids::SectionId;
use snowball_navigation::domain::context::BackgroundTrack;
use snowball_navigation::domain::ports::{NarrationPlayer, RenderFrame, SectionRenderer};
use snowball_story::{Section, SectionKind};
use tracing::{debug, info, warn};

/// Prints sections as text to `out`.
pub struct TerminalRenderer<W> {
    out: W,
    clock: Arc<dyn Clock>,
}

impl<W: Write + Send> TerminalRenderer<W> {
    #[must_use]
    pub fn new(out: W, clock: Arc<dyn Clock>) -> Self {
        Self { out, clock }
    }

    /// The underlying writer.
    #[must_use]
    pub fn output(&self) -> &W {
        &self.out
    }

    fn line(&mut self, text: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!(error = %e, "failed to write to terminal");
        }
    }
}

impl<W: Write + Send> SectionRenderer for TerminalRenderer<W> {
    fn fade_out(&mut self) {
        self.line(format_args!(""));
    }

    fn render(&mut self, section: &Section, frame: &RenderFrame) {
        let presentation = &section.presentation;
        let title = presentation.title.as_deref().unwrap_or(section.id.as_str());
        self.line(format_args!("== {title} =="));
        self.line(format_args!(
            "   step {} of the {} path, furthest step {}",
            section.step, section.branch, frame.max_step
        ));
        if let Some(video) = &presentation.video {
            self.line(format_args!("   [video: {video}]"));
        }

        match section.kind {
            SectionKind::Decision => {
                for (index, transition) in section.transitions.iter().enumerate() {
                    let label = transition.label.as_deref().unwrap_or(transition.target.as_str());
                    self.line(format_args!("   [{}] {label}", index + 1));
                }
            }
            SectionKind::Riddle => self.line(format_args!("   Type your answer:")),
            _ if section.gated && !frame.gate_revealed => {
                self.line(format_args!("   The way forward is not open yet."));
            }
            _ if section.is_terminal() => self.line(format_args!("   The end.")),
            _ => {
                let action = presentation.action_label.as_deref().unwrap_or("continue");
                self.line(format_args!("   Press Enter to {action}."));
            }
        }

        if !frame.visited.is_empty() {
            let visited: Vec<&str> = frame.visited.iter().map(SectionId::as_str).collect();
            self.line(format_args!("   visited: {}", visited.join(", ")));
        }
    }

    fn reveal_continue(&mut self, section: &SectionId) {
        info!(section = %section, "gate open");
        self.line(format_args!("   The way forward is open. Press Enter to continue."));
    }

    fn reject_answer(&mut self, _section: &SectionId) {
        self.line(format_args!("   That is not it. Try again:"));
    }

    fn start_countdown(&mut self, target: Option<DateTime<Utc>>) {
        let Some(target) = target else {
            return;
        };
        let remaining = target - self.clock.now();
        if remaining <= chrono::Duration::zero() {
            self.line(format_args!("   The moment has come."));
        } else {
            self.line(format_args!(
                "   {} days {} hours {} minutes to go",
                remaining.num_days(),
                remaining.num_hours() % 24,
                remaining.num_minutes() % 60
            ));
        }
    }

    fn stop_countdown(&mut self) {
        debug!("countdown stopped");
    }

    fn preload(&mut self, assets: &[String]) {
        debug!(?assets, "preloading");
    }
}

/// Reports audio changes to the log; a terminal has no speakers.
#[derive(Debug, Default)]
pub struct LoggedNarration {
    playing: Option<String>,
    background: BackgroundTrack,
}

impl LoggedNarration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NarrationPlayer for LoggedNarration {
    fn stop_narration(&mut self) {
        if let Some(asset) = self.playing.take() {
            debug!(%asset, "narration stopped");
        }
    }

    fn play_narration(&mut self, asset: &str) {
        info!(%asset, "narration playing");
        self.playing = Some(asset.to_owned());
    }

    fn switch_background(&mut self, track: BackgroundTrack) {
        info!(from = ?self.background, to = ?track, "background track");
        self.background = track;
    }
}

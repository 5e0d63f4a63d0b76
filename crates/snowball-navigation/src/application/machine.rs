//! The navigation state machine.
//!
//! States are section ids, transitions come from the section graph.
//! Every request to show a section passes through [`NavigationMachine::request_navigate`],
//! which enforces forward-only progression before anything is rendered.

use std::sync::Arc;
use std::time::Duration;

use snowball_core::clock::Clock;
use snowball_core::event::{DomainEvent, EventMetadata};
use snowball_core::ids::SectionId;
use snowball_core::time::TimeSource;
use snowball_progress::application::progress_store::ProgressStore;
use snowball_progress::domain::outcome::{InitialProgress, RemoteSignal, StepOutcome};
use snowball_story::{Branch, Section, SectionGraph, SectionKind};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::gate::{DEFAULT_GATE_POLL, GateSender, GateSignal, GateWatch};
use crate::application::listener;
use crate::domain::commands::{RemoteCommand, UserIntent};
use crate::domain::context::{BackgroundTrack, NavigationContext};
use crate::domain::events::{
    GateRevealed, NavigationEvent, NavigationEventKind, ProgressReset, RedirectReason, Redirected,
    SectionEntered,
};
use crate::domain::ports::{AnswerJudge, NarrationPlayer, RenderFrame, SectionRenderer};

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The requested section is now on screen.
    Entered(SectionId),
    /// The request was rewritten; `landed` is on screen.
    Redirected {
        requested: SectionId,
        landed: SectionId,
        reason: RedirectReason,
    },
    /// The requested section was already on screen.
    Unchanged,
}

/// The machine's outside collaborators.
pub struct Collaborators {
    pub renderer: Box<dyn SectionRenderer>,
    pub narration: Box<dyn NarrationPlayer>,
    pub judge: Arc<dyn AnswerJudge>,
    pub time: Arc<dyn TimeSource>,
    pub clock: Arc<dyn Clock>,
}

/// Decides what the subject sees and keeps progress moving forward only.
pub struct NavigationMachine {
    graph: Arc<SectionGraph>,
    progress: Arc<ProgressStore>,
    renderer: Box<dyn SectionRenderer>,
    narration: Box<dyn NarrationPlayer>,
    judge: Arc<dyn AnswerJudge>,
    time: Arc<dyn TimeSource>,
    clock: Arc<dyn Clock>,
    gate_poll: Duration,
    gate_signals: GateSender,
    correlation_id: Uuid,
    context: NavigationContext,
    events: Vec<NavigationEvent>,
}

impl std::fmt::Debug for NavigationMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationMachine")
            .field("context", &self.context)
            .field("gate_poll", &self.gate_poll)
            .finish_non_exhaustive()
    }
}

impl NavigationMachine {
    /// Creates a machine starting from reconciled progress. Nothing is
    /// rendered until the first navigation request.
    #[must_use]
    pub fn new(
        graph: Arc<SectionGraph>,
        progress: Arc<ProgressStore>,
        collaborators: Collaborators,
        gate_signals: GateSender,
        initial: &InitialProgress,
    ) -> Self {
        let mut context = NavigationContext::new(initial.max_step_reached, initial.gate_unlocked);
        context.committed_branch = initial
            .current_section
            .as_ref()
            .and_then(|id| graph.branch_of(id))
            .filter(|branch| !branch.is_common());
        Self {
            graph,
            progress,
            renderer: collaborators.renderer,
            narration: collaborators.narration,
            judge: collaborators.judge,
            time: collaborators.time,
            clock: collaborators.clock,
            gate_poll: DEFAULT_GATE_POLL,
            gate_signals,
            correlation_id: Uuid::new_v4(),
            context,
            events: Vec::new(),
        }
    }

    /// Overrides the interval between gate re-checks.
    #[must_use]
    pub fn with_gate_poll(mut self, poll: Duration) -> Self {
        self.gate_poll = poll;
        self
    }

    #[must_use]
    pub fn context(&self) -> &NavigationContext {
        &self.context
    }

    #[must_use]
    pub fn graph(&self) -> &SectionGraph {
        &self.graph
    }

    #[must_use]
    pub fn progress(&self) -> &Arc<ProgressStore> {
        &self.progress
    }

    /// Section on screen.
    #[must_use]
    pub fn current(&self) -> Option<&SectionId> {
        self.context.current()
    }

    /// Side branch the subject has committed to.
    #[must_use]
    pub fn current_branch(&self) -> Option<Branch> {
        self.context.committed_branch
    }

    /// Sections to mark visited, filtered by the committed branch.
    #[must_use]
    pub fn visited_sections(&self) -> Vec<SectionId> {
        self.graph
            .visited_sections(self.context.committed_branch, self.context.max_step)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Where a subject with the current progress belongs: the section at
    /// the furthest step on the committed branch, else the story start.
    #[must_use]
    pub fn canonical_start(&self) -> SectionId {
        self.graph
            .section_for_step_on(self.context.max_step, self.context.committed_branch)
            .unwrap_or_else(|| self.graph.start())
            .id
            .clone()
    }

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<NavigationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Shows `requested` if the subject may see it, otherwise the section
    /// the rules redirect to.
    pub async fn request_navigate(&mut self, requested: &SectionId) -> NavigationOutcome {
        let (landed, reason) = self.resolve(requested);
        if let Some(reason) = reason {
            info!(requested = %requested, landed = %landed, ?reason, "navigation redirected");
            self.record(NavigationEventKind::Redirected(Redirected {
                requested: requested.as_str().to_owned(),
                landed: landed.clone(),
                reason,
            }));
        }

        let entered = if self.context.current.as_ref() == Some(&landed) {
            false
        } else {
            self.enter(&landed).await
        };
        self.context.skip_next_narration = false;

        match reason {
            Some(reason) => NavigationOutcome::Redirected {
                requested: requested.clone(),
                landed,
                reason,
            },
            None if entered => NavigationOutcome::Entered(landed),
            None => NavigationOutcome::Unchanged,
        }
    }

    fn resolve(&self, requested: &SectionId) -> (SectionId, Option<RedirectReason>) {
        let Some(section) = self.graph.get(requested) else {
            return (self.canonical_start(), Some(RedirectReason::UnknownSection));
        };
        if section.step > self.context.max_step.saturating_add(1) {
            return (self.canonical_start(), Some(RedirectReason::BeyondReach));
        }
        if let Some(gated) = self.blocking_gate(section) {
            return (gated.id.clone(), Some(RedirectReason::GateClosed));
        }
        (section.id.clone(), None)
    }

    /// The gated section, when `section` lies past it on its branch and
    /// the subject may not go there yet.
    fn blocking_gate(&self, section: &Section) -> Option<&Section> {
        let gated = self.graph.gated_section()?;
        let beyond = section.branch == gated.branch && section.step > gated.step;
        let passed = self.context.max_step > gated.step;
        (beyond && !passed && !self.context.gate_open()).then_some(gated)
    }

    async fn enter(&mut self, id: &SectionId) -> bool {
        let graph = Arc::clone(&self.graph);
        let Some(section) = graph.get(id) else {
            return false;
        };

        if self.context.current.take().is_some() {
            self.renderer.fade_out();
            self.leave();
        }
        self.context.visit_epoch += 1;
        self.context.current = Some(section.id.clone());
        if !section.branch.is_common() {
            self.context.committed_branch = Some(section.branch);
        }
        let advanced = section.step > self.context.max_step;
        if advanced {
            self.context.max_step = section.step;
        }

        self.narration.stop_narration();
        let frame = self.frame();
        self.renderer.render(section, &frame);
        self.switch_background(BackgroundTrack::for_section(section));
        let skip_narration = std::mem::take(&mut self.context.skip_next_narration);
        if let Some(asset) = section.presentation.narration.as_deref().filter(|_| !skip_narration) {
            self.narration.play_narration(asset);
        }

        if section.gated {
            self.arrive_at_gate();
        }
        if section.kind == SectionKind::Countdown {
            self.renderer.start_countdown(self.graph.countdown_at());
            self.context.countdown_running = true;
        }
        self.preload_after(section);

        self.progress.record_location(&section.id).await;
        if advanced {
            let outcome = self.progress.record_step(section.step, &section.id).await;
            debug!(section = %section.id, ?outcome, "step recorded");
            match outcome {
                StepOutcome::Superseded { remote_max } => {
                    self.context.max_step = self.context.max_step.max(remote_max);
                }
                StepOutcome::RecordGone => {
                    info!(section = %section.id, "progress record deleted, waiting for reset");
                }
                StepOutcome::Committed | StepOutcome::AlreadyReached | StepOutcome::LocalOnly => {}
            }
        }

        info!(section = %section.id, step = section.step, advanced, "section entered");
        self.record(NavigationEventKind::SectionEntered(SectionEntered {
            section: section.id.clone(),
            step: section.step,
            branch: section.branch,
            advanced,
        }));
        true
    }

    fn leave(&mut self) {
        self.context.cancel_gate_watch();
        if self.context.countdown_running {
            self.renderer.stop_countdown();
            self.context.countdown_running = false;
        }
    }

    fn frame(&self) -> RenderFrame {
        RenderFrame {
            max_step: self.context.max_step,
            branch: self.context.committed_branch,
            visited: self.visited_sections(),
            gate_revealed: self.context.gate_revealed,
        }
    }

    fn switch_background(&mut self, track: BackgroundTrack) {
        if self.context.background != track {
            self.narration.switch_background(track);
            self.context.background = track;
        }
    }

    fn preload_after(&mut self, section: &Section) {
        let assets: Vec<String> = section
            .transitions
            .iter()
            .filter_map(|transition| self.graph.get(&transition.target))
            .flat_map(|next| {
                let presentation = &next.presentation;
                [&presentation.background, &presentation.narration, &presentation.video]
            })
            .flatten()
            .cloned()
            .collect();
        if !assets.is_empty() {
            self.renderer.preload(&assets);
        }
    }

    fn arrive_at_gate(&mut self) {
        if self.context.gate_open() {
            self.reveal_gate();
            return;
        }
        let Some(unlock_at) = self.graph.unlock_at() else {
            debug!("gate has no unlock time, waiting for administrator");
            return;
        };
        let handle = GateWatch {
            epoch: self.context.visit_epoch,
            unlock_at,
            poll: self.gate_poll,
            time: Arc::clone(&self.time),
            clock: Arc::clone(&self.clock),
            signals: self.gate_signals.clone(),
        }
        .spawn();
        self.context.gate_watch = Some(handle);
    }

    fn reveal_gate(&mut self) {
        let Some(current) = self.context.current.clone() else {
            return;
        };
        self.context.cancel_gate_watch();
        self.context.gate_revealed = true;
        self.renderer.reveal_continue(&current);
        info!(section = %current, "gate revealed");
        self.record(NavigationEventKind::GateRevealed(GateRevealed { section: current }));
    }

    fn on_gated_section(&self) -> bool {
        self.context
            .current
            .as_ref()
            .and_then(|id| self.graph.get(id))
            .is_some_and(|section| section.gated)
    }

    /// Applies a report from a gate watch. Returns `true` when it
    /// revealed the gate; signals from an earlier visit are ignored.
    pub fn handle_gate_signal(&mut self, signal: GateSignal) -> bool {
        if signal.epoch != self.context.visit_epoch || !self.on_gated_section() {
            debug!(
                epoch = signal.epoch,
                current_epoch = self.context.visit_epoch,
                "stale gate signal ignored"
            );
            return false;
        }
        self.reveal_gate();
        true
    }

    /// Turns a subject intent into the section it leads to, if any.
    /// Riddle answers are logged whether or not they are accepted.
    pub async fn resolve_intent(&mut self, intent: UserIntent) -> Option<SectionId> {
        let graph = Arc::clone(&self.graph);
        let section = graph.get(self.context.current.as_ref()?)?;
        match intent {
            UserIntent::Continue => {
                if matches!(section.kind, SectionKind::Decision | SectionKind::Riddle) {
                    return None;
                }
                if section.gated && !self.context.gate_open() {
                    debug!(section = %section.id, "continue ignored, gate closed");
                    return None;
                }
                section.next().map(|transition| transition.target.clone())
            }
            UserIntent::Choose(index) => {
                if section.kind != SectionKind::Decision {
                    return None;
                }
                let transition = section.transitions.get(index)?;
                self.context.skip_next_narration = transition.skips_narration;
                Some(transition.target.clone())
            }
            UserIntent::Answer(text) => {
                if section.kind != SectionKind::Riddle {
                    return None;
                }
                let riddle = section.presentation.riddle.as_deref()?;
                let correct = !text.trim().is_empty() && self.judge.is_correct(riddle, &text);
                self.progress.record_attempt(riddle, &text, correct).await;
                if correct {
                    section.next().map(|transition| transition.target.clone())
                } else {
                    self.renderer.reject_answer(&section.id);
                    None
                }
            }
        }
    }

    /// Commands implied by a remote signal, in application order.
    #[must_use]
    pub fn interpret(&self, signal: &RemoteSignal) -> Vec<RemoteCommand> {
        listener::interpret(signal, &self.context, |record| {
            self.progress.is_own_write(record)
        })
    }

    /// Applies a remote command to local state. Returns the section to
    /// navigate to for commands that move the subject.
    pub fn apply_remote(&mut self, command: &RemoteCommand) -> Option<SectionId> {
        match command {
            RemoteCommand::AdoptMaxStep(step) => {
                self.context.max_step = self.context.max_step.max(*step);
                None
            }
            RemoteCommand::UnlockGate => {
                self.context.gate_unlocked = true;
                if self.on_gated_section() {
                    self.reveal_gate();
                }
                None
            }
            RemoteCommand::Teleport(section) => Some(section.clone()),
            RemoteCommand::Reset => {
                self.context.reset_progress();
                self.progress.forget_local();
                let landed = self.canonical_start();
                info!(landed = %landed, "progress reset");
                self.record(NavigationEventKind::ProgressReset(ProgressReset {
                    landed: landed.clone(),
                }));
                Some(landed)
            }
        }
    }

    fn record(&mut self, kind: NavigationEventKind) {
        let mut event = NavigationEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: String::new(),
                correlation_id: self.correlation_id,
                occurred_at: self.clock.now(),
            },
            kind,
        };
        event.metadata.event_type = event.event_type().to_owned();
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AudioCall, Harness, RenderCall, patient_record};
    use snowball_core::record::ProgressRecord;
    use snowball_core::store::ProgressDocumentStore;
    use snowball_core::ids::RecordKey;

    fn id(raw: &str) -> SectionId {
        SectionId::from(raw)
    }

    #[tokio::test]
    async fn test_fresh_subject_reaches_decision_and_max_becomes_one() {
        // Arrange
        let mut h = Harness::fresh().await;
        h.machine.request_navigate(&id("intro")).await;

        // Act
        let outcome = h.machine.request_navigate(&id("decision")).await;

        // Assert
        assert_eq!(outcome, NavigationOutcome::Entered(id("decision")));
        assert_eq!(h.machine.context().max_step(), 1);
        let stored = h.remote.read(&RecordKey::default()).await.unwrap().unwrap();
        assert_eq!(stored.max_step_reached, 1);
        assert_eq!(stored.current_section, Some(id("decision")));
        assert_eq!(h.cache.peek(), Some(1));
    }

    #[tokio::test]
    async fn test_jump_beyond_reach_lands_on_section_at_max() {
        // Arrange
        let mut h = Harness::with_record(ProgressRecord {
            max_step_reached: 1,
            current_section: Some(id("decision")),
            ..ProgressRecord::default()
        })
        .await;

        // Act
        let outcome = h.machine.request_navigate(&id("explanation-2")).await;

        // Assert
        assert_eq!(
            outcome,
            NavigationOutcome::Redirected {
                requested: id("explanation-2"),
                landed: id("decision"),
                reason: RedirectReason::BeyondReach,
            }
        );
        assert_eq!(h.machine.current(), Some(&id("decision")));
        assert_eq!(h.machine.context().max_step(), 1);
    }

    #[tokio::test]
    async fn test_unknown_section_redirects_to_canonical_start() {
        let mut h = Harness::fresh().await;

        let outcome = h.machine.request_navigate(&id("secret-room")).await;

        assert!(matches!(
            outcome,
            NavigationOutcome::Redirected { reason: RedirectReason::UnknownSection, .. }
        ));
        assert_eq!(h.machine.current(), Some(&id("intro")));
    }

    #[tokio::test]
    async fn test_current_section_request_is_unchanged_and_not_rerendered() {
        // Arrange
        let mut h = Harness::fresh().await;
        h.machine.request_navigate(&id("intro")).await;
        let renders_before = h.rendered().len();

        // Act
        let outcome = h.machine.request_navigate(&id("intro")).await;

        // Assert
        assert_eq!(outcome, NavigationOutcome::Unchanged);
        assert_eq!(h.rendered().len(), renders_before);
    }

    #[tokio::test]
    async fn test_backward_navigation_keeps_max_step() {
        // Arrange
        let mut h = Harness::with_record(patient_record(4, "riddle-2")).await;
        h.machine.request_navigate(&id("riddle-2")).await;

        // Act
        let outcome = h.machine.request_navigate(&id("riddle-1")).await;

        // Assert
        assert_eq!(outcome, NavigationOutcome::Entered(id("riddle-1")));
        assert_eq!(h.machine.context().max_step(), 4);
        let stored = h.remote.read(&RecordKey::default()).await.unwrap().unwrap();
        assert_eq!(stored.max_step_reached, 4);
        assert_eq!(stored.current_section, Some(id("riddle-1")));
    }

    #[tokio::test]
    async fn test_entering_side_branch_commits_it() {
        // Arrange
        let mut h = Harness::with_record(ProgressRecord {
            max_step_reached: 1,
            current_section: Some(id("decision")),
            ..ProgressRecord::default()
        })
        .await;
        h.machine.request_navigate(&id("decision")).await;

        // Act
        h.machine.request_navigate(&id("confirm-1")).await;

        // Assert
        assert_eq!(h.machine.current_branch(), Some(Branch::Fast));
        let visited = h.machine.visited_sections();
        assert!(visited.contains(&id("confirm-1")));
        assert!(!visited.contains(&id("riddle-1")));
    }

    #[tokio::test]
    async fn test_canonical_start_follows_committed_branch() {
        let h = Harness::with_record(ProgressRecord {
            max_step_reached: 3,
            current_section: Some(id("confirm-2")),
            ..ProgressRecord::default()
        })
        .await;

        assert_eq!(h.machine.canonical_start(), id("confirm-2"));
    }

    #[tokio::test]
    async fn test_passing_closed_gate_redirects_to_gated_section() {
        // Arrange
        let mut h = Harness::with_record(patient_record(8, "pause")).await;
        h.machine.request_navigate(&id("pause")).await;

        // Act
        let outcome = h.machine.request_navigate(&id("finale")).await;

        // Assert
        assert!(matches!(
            outcome,
            NavigationOutcome::Redirected { reason: RedirectReason::GateClosed, .. }
        ));
        assert_eq!(h.machine.current(), Some(&id("pause")));
    }

    #[tokio::test]
    async fn test_subject_already_past_gate_may_revisit_finale() {
        let mut h = Harness::with_record(patient_record(10, "countdown")).await;

        let outcome = h.machine.request_navigate(&id("finale")).await;

        assert_eq!(outcome, NavigationOutcome::Entered(id("finale")));
    }

    #[tokio::test]
    async fn test_unlocked_gate_is_revealed_on_arrival() {
        // Arrange
        let mut record = patient_record(8, "pause");
        record.gate_unlocked = true;
        let mut h = Harness::with_record(record).await;

        // Act
        h.machine.request_navigate(&id("pause")).await;

        // Assert
        assert!(h.renders().contains(&RenderCall::RevealContinue(id("pause"))));
        assert!(!h.machine.context().gate_watch_active());
        assert_eq!(h.machine.resolve_intent(UserIntent::Continue).await, Some(id("finale")));
    }

    #[tokio::test]
    async fn test_closed_gate_starts_watch_and_blocks_continue() {
        // Arrange
        let mut h = Harness::before_unlock(patient_record(8, "pause")).await;

        // Act
        h.machine.request_navigate(&id("pause")).await;

        // Assert
        assert!(h.machine.context().gate_watch_active());
        assert_eq!(h.machine.resolve_intent(UserIntent::Continue).await, None);
    }

    #[tokio::test]
    async fn test_continue_is_ignored_on_riddles_and_decisions() {
        // Arrange
        let mut h = Harness::with_record(patient_record(2, "riddle-1")).await;
        h.machine.request_navigate(&id("riddle-1")).await;

        // Act
        let on_riddle = h.machine.resolve_intent(UserIntent::Continue).await;
        h.machine.request_navigate(&id("decision")).await;
        let on_decision = h.machine.resolve_intent(UserIntent::Continue).await;

        // Assert
        assert_eq!(on_riddle, None);
        assert_eq!(on_decision, None);
    }

    #[tokio::test]
    async fn test_leaving_gated_section_cancels_watch() {
        // Arrange
        let mut h = Harness::before_unlock(patient_record(8, "pause")).await;
        h.machine.request_navigate(&id("pause")).await;

        // Act
        h.machine.request_navigate(&id("explanation-3")).await;
        tokio::task::yield_now().await;

        // Assert
        assert!(!h.machine.context().gate_watch_active());
    }

    #[tokio::test]
    async fn test_stale_gate_signal_is_ignored() {
        // Arrange
        let mut h = Harness::before_unlock(patient_record(8, "pause")).await;
        h.machine.request_navigate(&id("pause")).await;
        let old_epoch = h.machine.context().visit_epoch();
        h.machine.request_navigate(&id("explanation-3")).await;
        h.machine.request_navigate(&id("pause")).await;

        // Act
        let revealed = h.machine.handle_gate_signal(GateSignal { epoch: old_epoch });

        // Assert
        assert!(!revealed);
        assert!(!h.machine.context().gate_revealed());
    }

    #[tokio::test]
    async fn test_gate_time_reached_reveals_through_signal() {
        // Arrange
        let mut h = Harness::after_unlock(patient_record(8, "pause")).await;
        h.machine.request_navigate(&id("pause")).await;

        // Act
        let signal = h.gate_signals.recv().await.unwrap();
        let revealed = h.machine.handle_gate_signal(signal);

        // Assert
        assert!(revealed);
        assert!(h.machine.context().gate_open());
        let events = h.machine.take_events();
        assert!(events.iter().any(|e| e.event_type() == "navigation.gate_revealed"));
    }

    #[tokio::test]
    async fn test_remote_unlock_on_gated_section_reveals_continue() {
        // Arrange
        let mut h = Harness::before_unlock(patient_record(8, "pause")).await;
        h.machine.request_navigate(&id("pause")).await;

        // Act
        h.machine.apply_remote(&RemoteCommand::UnlockGate);

        // Assert
        assert!(h.renders().contains(&RenderCall::RevealContinue(id("pause"))));
        assert!(!h.machine.context().gate_watch_active());
    }

    #[tokio::test]
    async fn test_choose_with_skip_suppresses_narration() {
        // Arrange
        let mut h = Harness::with_record(ProgressRecord {
            max_step_reached: 2,
            current_section: Some(id("confirm-1")),
            ..ProgressRecord::default()
        })
        .await;
        h.machine.request_navigate(&id("confirm-1")).await;
        h.clear_audio();

        // Act
        let target = h.machine.resolve_intent(UserIntent::Choose(1)).await.unwrap();
        h.machine.request_navigate(&target).await;

        // Assert
        assert_eq!(target, id("decision"));
        assert!(!h.audio().iter().any(|call| matches!(call, AudioCall::Play(_))));
    }

    #[tokio::test]
    async fn test_wrong_answer_is_logged_and_rejected() {
        // Arrange
        let mut h = Harness::with_record(patient_record(2, "riddle-1")).await;
        h.machine.request_navigate(&id("riddle-1")).await;

        // Act
        let target = h
            .machine
            .resolve_intent(UserIntent::Answer("persistence".into()))
            .await;

        // Assert
        assert_eq!(target, None);
        assert!(h.renders().contains(&RenderCall::RejectAnswer(id("riddle-1"))));
        let attempts = h.remote.recent_attempts(&RecordKey::default(), 5).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].is_correct);
    }

    #[tokio::test]
    async fn test_correct_answer_leads_to_explanation() {
        let mut h = Harness::with_record(patient_record(2, "riddle-1")).await;
        h.machine.request_navigate(&id("riddle-1")).await;

        let target = h
            .machine
            .resolve_intent(UserIntent::Answer("Constancy".into()))
            .await;

        assert_eq!(target, Some(id("explanation-1")));
    }

    #[tokio::test]
    async fn test_countdown_starts_and_stops_display() {
        // Arrange
        let mut h = Harness::with_record(patient_record(10, "countdown")).await;

        // Act
        h.machine.request_navigate(&id("countdown")).await;
        h.machine.request_navigate(&id("finale")).await;

        // Assert
        let renders = h.renders();
        assert!(renders.contains(&RenderCall::StartCountdown));
        assert!(renders.contains(&RenderCall::StopCountdown));
        assert!(!h.machine.context().countdown_running());
    }

    #[tokio::test]
    async fn test_background_switches_only_on_change() {
        // Arrange
        let mut h = Harness::with_record(patient_record(4, "riddle-2")).await;

        // Act
        h.machine.request_navigate(&id("riddle-1")).await;
        h.machine.request_navigate(&id("explanation-1")).await;

        // Assert
        let switches: Vec<_> = h
            .audio()
            .into_iter()
            .filter(|call| matches!(call, AudioCall::Background(_)))
            .collect();
        assert_eq!(switches, vec![AudioCall::Background(BackgroundTrack::Main)]);
    }

    #[tokio::test]
    async fn test_reset_forgets_progress_and_returns_start() {
        // Arrange
        let mut h = Harness::with_record(patient_record(6, "riddle-3")).await;
        h.machine.request_navigate(&id("riddle-3")).await;

        // Act
        let target = h.machine.apply_remote(&RemoteCommand::Reset);

        // Assert
        assert_eq!(target, Some(id("intro")));
        assert_eq!(h.machine.context().max_step(), 0);
        assert_eq!(h.machine.current_branch(), None);
    }

    #[tokio::test]
    async fn test_interpret_skips_teleport_for_own_echo() {
        // Arrange
        let mut h = Harness::with_record(patient_record(2, "riddle-1")).await;
        h.machine.request_navigate(&id("riddle-1")).await;
        let mut echo = h.remote.read(&RecordKey::default()).await.unwrap().unwrap();
        echo.current_section = Some(id("decision"));

        // Act
        let commands = h.machine.interpret(&RemoteSignal::Changed(echo));

        // Assert
        assert!(commands.is_empty());
    }
}

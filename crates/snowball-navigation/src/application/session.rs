//! The session loop.
//!
//! One cooperative loop drives everything: address changes and intents
//! from the subject, signals from the shared record and reports from gate
//! watches. Each input is handled to completion before the next is taken.

use snowball_core::event::DomainEvent;
use snowball_core::ids::SectionId;
use snowball_progress::application::feed::ProgressFeed;
use snowball_progress::domain::outcome::RemoteSignal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::application::gate::{GateReceiver, GateSignal};
use crate::application::machine::{NavigationMachine, NavigationOutcome};
use crate::application::router::HashRouter;
use crate::domain::commands::{RemoteCommand, UserIntent};
use crate::domain::ports::AddressBar;

/// Input from the subject's side of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// The address bar changed.
    AddressChanged,
    Intent(UserIntent),
    /// End the session.
    Quit,
}

/// A running session: machine, router and the channels feeding them.
pub struct Session<A> {
    machine: NavigationMachine,
    router: HashRouter<A>,
    gate_signals: GateReceiver,
    feed: Option<ProgressFeed>,
}

impl<A: AddressBar> Session<A> {
    #[must_use]
    pub fn new(machine: NavigationMachine, router: HashRouter<A>, gate_signals: GateReceiver) -> Self {
        Self {
            machine,
            router,
            gate_signals,
            feed: None,
        }
    }

    #[must_use]
    pub fn machine(&self) -> &NavigationMachine {
        &self.machine
    }

    #[must_use]
    pub fn router(&self) -> &HashRouter<A> {
        &self.router
    }

    /// Shows the first section and opens the remote feed.
    ///
    /// With an empty address the subject resumes at `resume_at` when it is
    /// a known section. The feed is opened after the first location write
    /// so the initial snapshot is recognised as this device's own.
    pub async fn boot(&mut self, resume_at: Option<&SectionId>) -> NavigationOutcome {
        if self.router.requested().is_none() {
            if let Some(section) = resume_at.filter(|id| self.machine.graph().get(id).is_some()) {
                self.router.navigate(section, true);
            }
        }
        let outcome = self.router.handle_address_change(&mut self.machine).await;
        self.feed = Some(self.machine.progress().subscribe().await);
        self.log_events();
        outcome
    }

    /// Handles one subject intent.
    pub async fn handle_intent(&mut self, intent: UserIntent) -> Option<NavigationOutcome> {
        let target = self.machine.resolve_intent(intent).await?;
        let outcome = self.router.follow(&mut self.machine, &target, false).await;
        self.log_events();
        Some(outcome)
    }

    /// Handles one signal from the shared record.
    pub async fn handle_remote(&mut self, signal: RemoteSignal) -> Vec<NavigationOutcome> {
        let mut outcomes = Vec::new();
        for command in self.machine.interpret(&signal) {
            info!(command = %command, "applying remote command");
            if let Some(target) = self.machine.apply_remote(&command) {
                let replace = matches!(command, RemoteCommand::Reset);
                outcomes.push(self.router.follow(&mut self.machine, &target, replace).await);
            }
        }
        self.log_events();
        outcomes
    }

    /// Handles one gate watch report.
    pub fn handle_gate_signal(&mut self, signal: GateSignal) -> bool {
        let revealed = self.machine.handle_gate_signal(signal);
        self.log_events();
        revealed
    }

    /// Runs until `inputs` closes or delivers [`SessionInput::Quit`].
    pub async fn run(mut self, mut inputs: mpsc::Receiver<SessionInput>) -> Self {
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    None | Some(SessionInput::Quit) => break,
                    Some(SessionInput::AddressChanged) => {
                        self.router.handle_address_change(&mut self.machine).await;
                        self.log_events();
                    }
                    Some(SessionInput::Intent(intent)) => {
                        self.handle_intent(intent).await;
                    }
                },
                signal = next_signal(&mut self.feed) => match signal {
                    Some(signal) => {
                        self.handle_remote(signal).await;
                    }
                    None => warn!("remote feed closed, continuing with local progress"),
                },
                Some(signal) = self.gate_signals.recv() => {
                    self.handle_gate_signal(signal);
                }
            }
        }
        info!("session ended");
        self
    }

    fn log_events(&mut self) {
        for event in self.machine.take_events() {
            info!(
                event_type = event.event_type(),
                event_id = %event.metadata().event_id,
                payload = %event.to_payload(),
                "navigation event"
            );
        }
    }
}

async fn next_signal(feed: &mut Option<ProgressFeed>) -> Option<RemoteSignal> {
    match feed {
        Some(feed) if feed.is_open() => feed.next().await,
        _ => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use snowball_core::ids::RecordKey;
    use snowball_core::record::ProgressPatch;
    use snowball_core::store::ProgressDocumentStore;

    use super::*;
    use crate::application::router::MemoryAddressBar;
    use crate::testing::{Harness, Observers, RenderCall, patient_record};

    fn start_session(h: Harness, bar: MemoryAddressBar) -> (Session<MemoryAddressBar>, Observers) {
        let (machine, gate_signals, rest) = h.split();
        (Session::new(machine, HashRouter::new(bar), gate_signals), rest)
    }

    #[tokio::test]
    async fn test_boot_resumes_at_last_known_section() {
        // Arrange
        let h = Harness::with_record(patient_record(4, "explanation-1")).await;
        let (mut session, _h) = start_session(h, MemoryAddressBar::new());

        // Act
        let outcome = session.boot(Some(&SectionId::from("explanation-1"))).await;

        // Assert
        assert_eq!(outcome, NavigationOutcome::Entered(SectionId::from("explanation-1")));
        assert_eq!(session.router().address_bar().history(), ["explanation-1"]);
    }

    #[tokio::test]
    async fn test_boot_prefers_address_over_resume_point() {
        let h = Harness::with_record(patient_record(4, "explanation-1")).await;
        let (mut session, _h) = start_session(h, MemoryAddressBar::at("riddle-1"));

        let outcome = session.boot(Some(&SectionId::from("explanation-1"))).await;

        assert_eq!(outcome, NavigationOutcome::Entered(SectionId::from("riddle-1")));
    }

    #[tokio::test]
    async fn test_teleport_from_admin_moves_subject_and_address() {
        // Arrange
        let h = Harness::with_record(patient_record(8, "riddle-3")).await;
        let (mut session, h) = start_session(h, MemoryAddressBar::new());
        session.boot(Some(&SectionId::from("riddle-3"))).await;
        let key = RecordKey::default();
        h.remote
            .merge_write(
                &key,
                &ProgressPatch::location(SectionId::from("pause"), Utc::now(), Some("admin".into())),
            )
            .await
            .unwrap();
        let (_tx, inputs) = mpsc::channel(1);

        // Act
        let run = tokio::spawn(session.run(inputs));
        tokio::time::sleep(Duration::from_millis(50)).await;
        run.abort();

        // Assert
        let stored = h.remote.read(&key).await.unwrap().unwrap();
        assert_eq!(stored.current_section, Some(SectionId::from("pause")));
        assert!(stored.updated_by.as_deref() != Some("admin"));
        assert!(h.renders().contains(&RenderCall::Render(SectionId::from("pause"))));
    }

    #[tokio::test]
    async fn test_hard_reset_returns_subject_to_intro() {
        // Arrange
        let h = Harness::with_record(patient_record(6, "riddle-3")).await;
        let (mut session, h) = start_session(h, MemoryAddressBar::new());
        session.boot(Some(&SectionId::from("riddle-3"))).await;

        // Act
        let outcomes = session.handle_remote(RemoteSignal::HardReset).await;

        // Assert
        assert_eq!(outcomes, vec![NavigationOutcome::Entered(SectionId::from("intro"))]);
        assert_eq!(session.machine().context().max_step(), 0);
        assert_eq!(session.router().address_bar().history(), ["intro"]);
        assert_eq!(h.cache.peek(), None);
    }

    #[tokio::test]
    async fn test_advancing_after_record_deleted_does_not_bring_progress_back() {
        // Arrange
        let h = Harness::with_record(patient_record(6, "riddle-3")).await;
        let (mut session, h) = start_session(h, MemoryAddressBar::new());
        session.boot(Some(&SectionId::from("riddle-3"))).await;
        let key = RecordKey::default();
        h.remote.delete(&key).await.unwrap();

        // Act
        session
            .handle_intent(UserIntent::Answer("discipline".into()))
            .await;
        let (tx, inputs) = mpsc::channel(1);
        let run = tokio::spawn(session.run(inputs));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(SessionInput::Quit).await.unwrap();
        let session = run.await.unwrap();

        // Assert
        let stored = h.remote.read(&key).await.unwrap();
        assert_eq!(stored.map_or(0, |record| record.max_step_reached), 0);
        assert_eq!(h.cache.peek(), None);
        assert_eq!(session.machine().context().max_step(), 0);
        assert_eq!(session.machine().current(), Some(&SectionId::from("intro")));
    }

    #[tokio::test]
    async fn test_intents_walk_the_patient_path() {
        // Arrange
        let h = Harness::fresh().await;
        let (mut session, _h) = start_session(h, MemoryAddressBar::new());
        session.boot(None).await;

        // Act
        session.handle_intent(UserIntent::Continue).await;
        session.handle_intent(UserIntent::Choose(1)).await;
        let outcome = session
            .handle_intent(UserIntent::Answer("constancy".into()))
            .await;

        // Assert
        assert_eq!(outcome, Some(NavigationOutcome::Entered(SectionId::from("explanation-1"))));
        assert_eq!(session.machine().context().max_step(), 3);
        assert_eq!(
            session.router().address_bar().history(),
            ["intro", "decision", "riddle-1", "explanation-1"]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_quit() {
        let h = Harness::fresh().await;
        let (mut session, _h) = start_session(h, MemoryAddressBar::new());
        session.boot(None).await;
        let (tx, inputs) = mpsc::channel(4);
        tx.send(SessionInput::Intent(UserIntent::Continue)).await.unwrap();
        tx.send(SessionInput::Quit).await.unwrap();

        let session = session.run(inputs).await;

        assert_eq!(session.machine().current(), Some(&SectionId::from("decision")));
    }
}

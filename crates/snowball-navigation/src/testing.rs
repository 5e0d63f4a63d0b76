//! Recording collaborators and a machine harness for tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use snowball_core::ids::{RecordKey, SectionId};
use snowball_core::record::ProgressRecord;
use snowball_core::store::ProgressDocumentStore;
use snowball_progress::application::progress_store::ProgressStore;
use snowball_store::memory_store::InMemoryDocumentStore;
use snowball_story::{Section, SectionGraph};
use snowball_test_support::{FixedClock, FixedTimeSource, MemoryCache};

use crate::application::gate::{GateReceiver, gate_channel};
use crate::application::machine::{Collaborators, NavigationMachine};
use crate::domain::context::BackgroundTrack;
use crate::domain::ports::{AnswerJudge, NarrationPlayer, RenderFrame, SectionRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RenderCall {
    FadeOut,
    Render(SectionId),
    RevealContinue(SectionId),
    RejectAnswer(SectionId),
    StartCountdown,
    StopCountdown,
    Preload(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AudioCall {
    Stop,
    Play(String),
    Background(BackgroundTrack),
}

pub(crate) struct RecordingRenderer(Arc<Mutex<Vec<RenderCall>>>);

impl SectionRenderer for RecordingRenderer {
    fn fade_out(&mut self) {
        self.0.lock().unwrap().push(RenderCall::FadeOut);
    }

    fn render(&mut self, section: &Section, _frame: &RenderFrame) {
        self.0.lock().unwrap().push(RenderCall::Render(section.id.clone()));
    }

    fn reveal_continue(&mut self, section: &SectionId) {
        self.0
            .lock()
            .unwrap()
            .push(RenderCall::RevealContinue(section.clone()));
    }

    fn reject_answer(&mut self, section: &SectionId) {
        self.0
            .lock()
            .unwrap()
            .push(RenderCall::RejectAnswer(section.clone()));
    }

    fn start_countdown(&mut self, _target: Option<DateTime<Utc>>) {
        self.0.lock().unwrap().push(RenderCall::StartCountdown);
    }

    fn stop_countdown(&mut self) {
        self.0.lock().unwrap().push(RenderCall::StopCountdown);
    }

    fn preload(&mut self, assets: &[String]) {
        self.0.lock().unwrap().push(RenderCall::Preload(assets.to_vec()));
    }
}

pub(crate) struct RecordingNarration(Arc<Mutex<Vec<AudioCall>>>);

impl NarrationPlayer for RecordingNarration {
    fn stop_narration(&mut self) {
        self.0.lock().unwrap().push(AudioCall::Stop);
    }

    fn play_narration(&mut self, asset: &str) {
        self.0.lock().unwrap().push(AudioCall::Play(asset.to_owned()));
    }

    fn switch_background(&mut self, track: BackgroundTrack) {
        self.0.lock().unwrap().push(AudioCall::Background(track));
    }
}

/// Accepts an answer equal to the riddle key, ignoring case.
pub(crate) struct KeyJudge;

impl AnswerJudge for KeyJudge {
    fn is_correct(&self, riddle: &str, answer: &str) -> bool {
        answer.trim().eq_ignore_ascii_case(riddle)
    }
}

pub(crate) fn patient_record(max_step: u32, section: &str) -> ProgressRecord {
    ProgressRecord {
        max_step_reached: max_step,
        current_section: Some(SectionId::from(section)),
        ..ProgressRecord::default()
    }
}

/// Handles for inspecting what the machine did.
pub(crate) struct Observers {
    pub remote: Arc<InMemoryDocumentStore>,
    pub cache: Arc<MemoryCache>,
    render_log: Arc<Mutex<Vec<RenderCall>>>,
    audio_log: Arc<Mutex<Vec<AudioCall>>>,
}

impl Observers {
    pub fn renders(&self) -> Vec<RenderCall> {
        self.render_log.lock().unwrap().clone()
    }

    pub fn audio(&self) -> Vec<AudioCall> {
        self.audio_log.lock().unwrap().clone()
    }
}

/// A connected machine over an in-memory store, with recording
/// collaborators.
pub(crate) struct Harness {
    pub machine: NavigationMachine,
    pub gate_signals: GateReceiver,
    pub remote: Arc<InMemoryDocumentStore>,
    pub cache: Arc<MemoryCache>,
    render_log: Arc<Mutex<Vec<RenderCall>>>,
    audio_log: Arc<Mutex<Vec<AudioCall>>>,
}

fn before_unlock_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap()
}

fn after_unlock_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

impl Harness {
    pub async fn fresh() -> Self {
        Self::build(None, before_unlock_time()).await
    }

    pub async fn with_record(record: ProgressRecord) -> Self {
        Self::build(Some(record), before_unlock_time()).await
    }

    pub async fn before_unlock(record: ProgressRecord) -> Self {
        Self::build(Some(record), before_unlock_time()).await
    }

    pub async fn after_unlock(record: ProgressRecord) -> Self {
        Self::build(Some(record), after_unlock_time()).await
    }

    async fn build(record: Option<ProgressRecord>, now: DateTime<Utc>) -> Self {
        let key = RecordKey::default();
        let remote = Arc::new(match record {
            Some(record) => InMemoryDocumentStore::with_record(&key, record),
            None => InMemoryDocumentStore::new(),
        });
        let cache = Arc::new(MemoryCache::new());
        let clock = Arc::new(FixedClock(now));
        let progress = Arc::new(ProgressStore::new(
            key,
            Arc::clone(&remote) as Arc<dyn ProgressDocumentStore>,
            Arc::clone(&cache) as Arc<dyn snowball_core::cache::LocalCache>,
            Arc::clone(&clock) as Arc<dyn snowball_core::clock::Clock>,
        ));
        progress.connect().await;
        let initial = progress.load_initial().await;

        let render_log = Arc::new(Mutex::new(Vec::new()));
        let audio_log = Arc::new(Mutex::new(Vec::new()));
        let (gate_tx, gate_signals) = gate_channel();
        let machine = NavigationMachine::new(
            Arc::new(SectionGraph::builtin().unwrap()),
            progress,
            Collaborators {
                renderer: Box::new(RecordingRenderer(Arc::clone(&render_log))),
                narration: Box::new(RecordingNarration(Arc::clone(&audio_log))),
                judge: Arc::new(KeyJudge),
                time: Arc::new(FixedTimeSource(now)),
                clock,
            },
            gate_tx,
            &initial,
        );

        Self {
            machine,
            gate_signals,
            remote,
            cache,
            render_log,
            audio_log,
        }
    }

    pub fn split(self) -> (NavigationMachine, GateReceiver, Observers) {
        (
            self.machine,
            self.gate_signals,
            Observers {
                remote: self.remote,
                cache: self.cache,
                render_log: self.render_log,
                audio_log: self.audio_log,
            },
        )
    }

    pub fn renders(&self) -> Vec<RenderCall> {
        self.render_log.lock().unwrap().clone()
    }

    /// Sections rendered, in order.
    pub fn rendered(&self) -> Vec<SectionId> {
        self.renders()
            .into_iter()
            .filter_map(|call| match call {
                RenderCall::Render(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn audio(&self) -> Vec<AudioCall> {
        self.audio_log.lock().unwrap().clone()
    }

    pub fn clear_audio(&self) {
        self.audio_log.lock().unwrap().clear();
    }
}

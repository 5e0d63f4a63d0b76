//! The device-side progress store.
//!
//! Owns both copies of the subject's progress: the advisory local cache
//! and the shared remote record. Remote calls are bounded by a timeout
//! and every connectivity failure degrades to cache-only operation
//! instead of surfacing to the session.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use snowball_core::cache::LocalCache;
use snowball_core::clock::Clock;
use snowball_core::error::DomainError;
use snowball_core::ids::{RecordKey, SectionId, SessionIdentity};
use snowball_core::record::{AttemptEntry, ProgressPatch, ProgressRecord};
use snowball_core::store::{ProgressDocumentStore, RecordSnapshot, WriteGuard};
use tracing::{debug, info, instrument, warn};

use crate::application::feed::ProgressFeed;
use crate::domain::outcome::{InitialProgress, ProgressSource, RemoteSignal, StepOutcome};

/// Upper bound for a single remote call when none is configured.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_millis(4000);

/// Sole writer of the local cache and the remote progress record.
pub struct ProgressStore {
    key: RecordKey,
    remote: Arc<dyn ProgressDocumentStore>,
    cache: Arc<dyn LocalCache>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    identity: Mutex<Option<SessionIdentity>>,
    known_max: AtomicU32,
    record_seen: AtomicBool,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("key", &self.key)
            .field("timeout", &self.timeout)
            .field("known_max", &self.known_max)
            .field("record_seen", &self.record_seen)
            .finish_non_exhaustive()
    }
}

impl ProgressStore {
    /// Creates a store for the record at `key`. The store is offline
    /// until [`Self::connect`] succeeds.
    #[must_use]
    pub fn new(
        key: RecordKey,
        remote: Arc<dyn ProgressDocumentStore>,
        cache: Arc<dyn LocalCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            key,
            remote,
            cache,
            clock,
            timeout: DEFAULT_REMOTE_TIMEOUT,
            identity: Mutex::new(None),
            known_max: AtomicU32::new(0),
            record_seen: AtomicBool::new(false),
        }
    }

    /// Overrides the per-call remote timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Performs the anonymous identity handshake. On failure the store
    /// stays offline and every remote operation becomes a logged no-op.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn connect(&self) -> Option<SessionIdentity> {
        match self.bounded("sign_in", self.remote.sign_in_anonymously()).await {
            Ok(identity) => {
                info!(uid = %identity.uid, "connected to progress store");
                *self.lock_identity() = Some(identity.clone());
                Some(identity)
            }
            Err(e) => {
                warn!(error = %e, "progress store unreachable, running offline");
                None
            }
        }
    }

    /// The record key this store reads and writes.
    #[must_use]
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// Whether the identity handshake succeeded.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.lock_identity().is_some()
    }

    /// Identity handed out at connect time.
    #[must_use]
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.lock_identity().clone()
    }

    /// Returns `true` when `record` was last written by this device.
    #[must_use]
    pub fn is_own_write(&self, record: &ProgressRecord) -> bool {
        match (self.lock_identity().as_ref(), record.updated_by.as_deref()) {
            (Some(identity), Some(writer)) => identity.uid == writer,
            _ => false,
        }
    }

    /// Furthest step this device knows about.
    #[must_use]
    pub fn known_max(&self) -> u32 {
        self.known_max.load(Ordering::SeqCst)
    }

    /// Reads both sides and reconciles them by maximum, writing the
    /// winner back into the loser.
    ///
    /// Never fails: an unreachable remote leaves the cache as the only
    /// source, and an unreadable cache counts as empty.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn load_initial(&self) -> InitialProgress {
        let cached = self.cache.load().unwrap_or_else(|e| {
            warn!(error = %e, "local cache unreadable, treating as empty");
            None
        });

        let remote = if self.is_online() {
            match self.bounded("read", self.remote.read(&self.key)).await {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "remote read failed, using local cache");
                    None
                }
            }
        } else {
            None
        };

        let initial = match remote {
            None => InitialProgress {
                max_step_reached: cached.unwrap_or(0),
                current_section: None,
                gate_unlocked: false,
                source: if cached.is_some() {
                    ProgressSource::Cache
                } else {
                    ProgressSource::Fresh
                },
            },
            Some(record) => self.reconcile(cached, record).await,
        };

        self.known_max
            .fetch_max(initial.max_step_reached, Ordering::SeqCst);
        info!(
            max_step = initial.max_step_reached,
            source = ?initial.source,
            "initial progress loaded"
        );
        initial
    }

    async fn reconcile(&self, cached: Option<u32>, record: Option<ProgressRecord>) -> InitialProgress {
        if record.is_some() {
            self.record_seen.store(true, Ordering::SeqCst);
        }
        let local_max = cached.unwrap_or(0);
        let Some(record) = record else {
            if local_max == 0 {
                return InitialProgress::fresh();
            }
            if let Ok(false) = self.push_step(local_max, None, false).await {
                debug!("record appeared during write-back");
            }
            return InitialProgress {
                max_step_reached: local_max,
                current_section: None,
                gate_unlocked: false,
                source: ProgressSource::Cache,
            };
        };

        if local_max > record.max_step_reached {
            debug!(
                local = local_max,
                remote = record.max_step_reached,
                "cache ahead of remote, writing back"
            );
            if let Ok(false) = self.push_step(local_max, None, true).await {
                debug!("remote changed during write-back");
            }
            return InitialProgress {
                max_step_reached: local_max,
                current_section: None,
                gate_unlocked: record.gate_unlocked,
                source: ProgressSource::Cache,
            };
        }

        if cached != Some(record.max_step_reached) {
            self.write_cache(record.max_step_reached);
        }
        InitialProgress {
            max_step_reached: record.max_step_reached,
            current_section: record.current_section,
            gate_unlocked: record.gate_unlocked,
            source: ProgressSource::Remote,
        }
    }

    /// Advances the furthest step to `step`, entered at `section`.
    ///
    /// The cache is updated first. The remote write is conditional on the
    /// stored value still being below `step`, so a concurrent writer that
    /// got further is never overwritten. A record deleted after this
    /// device saw it is not recreated.
    #[instrument(skip_all, fields(key = %self.key, step = step, section = %section))]
    pub async fn record_step(&self, step: u32, section: &SectionId) -> StepOutcome {
        let previous = self.known_max.fetch_max(step, Ordering::SeqCst);
        if step <= previous {
            return StepOutcome::AlreadyReached;
        }
        self.catch_up_cache(step);

        if !self.is_online() {
            debug!("offline, step kept locally");
            return StepOutcome::LocalOnly;
        }

        let fresh = match self.bounded("read", self.remote.read(&self.key)).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "could not read remote before step write");
                return StepOutcome::LocalOnly;
            }
        };
        if fresh.is_none() && self.record_seen.load(Ordering::SeqCst) {
            info!("remote record deleted, step not written");
            return StepOutcome::RecordGone;
        }
        let remote_max = fresh.as_ref().map_or(0, |record| record.max_step_reached);
        if remote_max >= step {
            info!(remote_max, "remote already further, adopting");
            self.adopt(remote_max);
            return StepOutcome::Superseded { remote_max };
        }

        match self.push_step(step, Some(section.clone()), fresh.is_some()).await {
            Ok(true) => {
                info!(from = remote_max, "step committed");
                StepOutcome::Committed
            }
            Ok(false) => self.settle_refused_step().await,
            Err(_) => StepOutcome::LocalOnly,
        }
    }

    /// Records where the subject is looking. Leaves the furthest step
    /// alone and never recreates a deleted record; failures are only
    /// logged.
    #[instrument(skip_all, fields(key = %self.key, section = %section))]
    pub async fn record_location(&self, section: &SectionId) {
        if !self.is_online() {
            return;
        }
        let patch = ProgressPatch::location(section.clone(), self.clock.now(), self.writer());
        let guard = WriteGuard {
            must_exist: self.record_seen.load(Ordering::SeqCst),
            below_step: None,
        };
        match self
            .bounded("merge_write_if", self.remote.merge_write_if(&self.key, &patch, guard))
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!("remote record deleted, location not written"),
            Err(e) => warn!(error = %e, "location update failed"),
        }
    }

    /// Appends a riddle answer to the attempt log. Best effort.
    #[instrument(skip_all, fields(key = %self.key, riddle = riddle_id, correct = is_correct))]
    pub async fn record_attempt(&self, riddle_id: &str, raw_answer_text: &str, is_correct: bool) {
        if !self.is_online() {
            return;
        }
        let attempt = AttemptEntry {
            riddle_id: riddle_id.to_owned(),
            raw_answer_text: raw_answer_text.to_owned(),
            is_correct,
            timestamp: self.clock.now(),
        };
        if let Err(e) = self
            .bounded("append_attempt", self.remote.append_attempt(&self.key, &attempt))
            .await
        {
            warn!(error = %e, "attempt not recorded");
        }
    }

    /// Opens a live feed of remote changes. Offline or on failure the
    /// feed is closed from the start.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn subscribe(self: &Arc<Self>) -> ProgressFeed {
        if !self.is_online() {
            return ProgressFeed::closed(Arc::clone(self));
        }
        match self
            .bounded("subscribe", self.remote.subscribe(&self.key))
            .await
        {
            Ok(subscription) => ProgressFeed::new(Arc::clone(self), subscription),
            Err(e) => {
                warn!(error = %e, "remote subscription unavailable");
                ProgressFeed::closed(Arc::clone(self))
            }
        }
    }

    /// Folds one snapshot into local knowledge and classifies it.
    ///
    /// Absence only counts as a reset once the record has been seen;
    /// before that it is the normal state of a fresh subject.
    pub(crate) fn observe(&self, snapshot: RecordSnapshot) -> Option<RemoteSignal> {
        match snapshot {
            Some(record) => {
                self.record_seen.store(true, Ordering::SeqCst);
                let previous = self
                    .known_max
                    .fetch_max(record.max_step_reached, Ordering::SeqCst);
                if record.max_step_reached > previous {
                    self.catch_up_cache(record.max_step_reached);
                }
                Some(RemoteSignal::Changed(record))
            }
            None if self.record_seen.swap(false, Ordering::SeqCst) => {
                warn!(key = %self.key, "remote record deleted, clearing local progress");
                self.forget_local();
                Some(RemoteSignal::HardReset)
            }
            None => {
                debug!(key = %self.key, "record not created yet");
                None
            }
        }
    }

    /// Drops everything this device knows about progress.
    pub fn forget_local(&self) {
        self.known_max.store(0, Ordering::SeqCst);
        if let Err(e) = self.cache.clear() {
            warn!(error = %e, "could not clear local cache");
        }
    }

    async fn push_step(
        &self,
        step: u32,
        section: Option<SectionId>,
        must_exist: bool,
    ) -> Result<bool, DomainError> {
        let patch = ProgressPatch::step(step, section, self.clock.now(), self.writer());
        let guard = WriteGuard::advancing_to(step, must_exist);
        self.bounded("merge_write_if", self.remote.merge_write_if(&self.key, &patch, guard))
            .await
            .inspect_err(|e| warn!(error = %e, step, "remote step write failed"))
    }

    /// Classifies a step write the store refused: someone got further, or
    /// the record disappeared in between.
    async fn settle_refused_step(&self) -> StepOutcome {
        match self.bounded("read", self.remote.read(&self.key)).await {
            Ok(Some(record)) => {
                let remote_max = record.max_step_reached;
                info!(remote_max, "concurrent writer got further, adopting");
                self.adopt(remote_max);
                StepOutcome::Superseded { remote_max }
            }
            Ok(None) => {
                info!("remote record deleted during step write");
                StepOutcome::RecordGone
            }
            Err(e) => {
                warn!(error = %e, "could not re-read remote after refused write");
                StepOutcome::LocalOnly
            }
        }
    }

    fn adopt(&self, remote_max: u32) {
        self.known_max.fetch_max(remote_max, Ordering::SeqCst);
        self.catch_up_cache(remote_max);
    }

    fn catch_up_cache(&self, step: u32) {
        match self.cache.load() {
            Ok(Some(cached)) if cached >= step => {}
            Ok(_) => self.write_cache(step),
            Err(e) => {
                warn!(error = %e, "local cache unreadable, overwriting");
                self.write_cache(step);
            }
        }
    }

    fn write_cache(&self, step: u32) {
        if let Err(e) = self.cache.store(step) {
            warn!(error = %e, step, "could not write local cache");
        }
    }

    fn writer(&self) -> Option<String> {
        self.lock_identity()
            .as_ref()
            .map(|identity| identity.uid.clone())
    }

    fn lock_identity(&self) -> std::sync::MutexGuard<'_, Option<SessionIdentity>> {
        self.identity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(DomainError::Timeout(format!("{operation} on {}", self.key))))
    }
}

//! Test document stores: mock `ProgressDocumentStore` implementations.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use snowball_core::error::DomainError;
use snowball_core::ids::{RecordKey, SessionIdentity};
use snowball_core::record::{AttemptEntry, ProgressPatch, ProgressRecord};
use snowball_core::store::{ProgressDocumentStore, RecordSubscription, WriteGuard};

fn unreachable_error() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// A store that is never reachable, not even for the sign-in handshake.
/// Useful for testing offline degradation.
#[derive(Debug)]
pub struct FailingDocumentStore;

#[async_trait]
impl ProgressDocumentStore for FailingDocumentStore {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, DomainError> {
        Err(unreachable_error())
    }

    async fn read(&self, _key: &RecordKey) -> Result<Option<ProgressRecord>, DomainError> {
        Err(unreachable_error())
    }

    async fn merge_write(&self, _key: &RecordKey, _patch: &ProgressPatch) -> Result<(), DomainError> {
        Err(unreachable_error())
    }

    async fn merge_write_if(
        &self,
        _key: &RecordKey,
        _patch: &ProgressPatch,
        _guard: WriteGuard,
    ) -> Result<bool, DomainError> {
        Err(unreachable_error())
    }

    async fn delete(&self, _key: &RecordKey) -> Result<(), DomainError> {
        Err(unreachable_error())
    }

    async fn subscribe(&self, _key: &RecordKey) -> Result<RecordSubscription, DomainError> {
        Err(unreachable_error())
    }

    async fn append_attempt(&self, _key: &RecordKey, _attempt: &AttemptEntry) -> Result<(), DomainError> {
        Err(unreachable_error())
    }

    async fn recent_attempts(
        &self,
        _key: &RecordKey,
        _limit: usize,
    ) -> Result<Vec<AttemptEntry>, DomainError> {
        Err(unreachable_error())
    }

    async fn clear_attempts(&self, _key: &RecordKey) -> Result<u64, DomainError> {
        Err(unreachable_error())
    }
}

/// A store that signs in fine but whose reads never complete. Useful for
/// testing that loading is bounded by a timeout.
#[derive(Debug)]
pub struct HangingDocumentStore;

#[async_trait]
impl ProgressDocumentStore for HangingDocumentStore {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, DomainError> {
        Ok(SessionIdentity::new("hanging"))
    }

    async fn read(&self, _key: &RecordKey) -> Result<Option<ProgressRecord>, DomainError> {
        std::future::pending().await
    }

    async fn merge_write(&self, _key: &RecordKey, _patch: &ProgressPatch) -> Result<(), DomainError> {
        std::future::pending().await
    }

    async fn merge_write_if(
        &self,
        _key: &RecordKey,
        _patch: &ProgressPatch,
        _guard: WriteGuard,
    ) -> Result<bool, DomainError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &RecordKey) -> Result<(), DomainError> {
        std::future::pending().await
    }

    async fn subscribe(&self, _key: &RecordKey) -> Result<RecordSubscription, DomainError> {
        std::future::pending().await
    }

    async fn append_attempt(&self, _key: &RecordKey, _attempt: &AttemptEntry) -> Result<(), DomainError> {
        std::future::pending().await
    }

    async fn recent_attempts(
        &self,
        _key: &RecordKey,
        _limit: usize,
    ) -> Result<Vec<AttemptEntry>, DomainError> {
        std::future::pending().await
    }

    async fn clear_attempts(&self, _key: &RecordKey) -> Result<u64, DomainError> {
        std::future::pending().await
    }
}

/// Wraps another store and fails every operation while switched offline.
/// Models a device that loses connectivity mid-session.
pub struct FlakyDocumentStore {
    inner: Arc<dyn ProgressDocumentStore>,
    offline: AtomicBool,
}

impl FlakyDocumentStore {
    /// Wraps `inner`, starting online.
    #[must_use]
    pub fn new(inner: Arc<dyn ProgressDocumentStore>) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
        }
    }

    /// Switches connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(unreachable_error())
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for FlakyDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakyDocumentStore")
            .field("offline", &self.offline)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProgressDocumentStore for FlakyDocumentStore {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, DomainError> {
        self.check()?;
        self.inner.sign_in_anonymously().await
    }

    async fn read(&self, key: &RecordKey) -> Result<Option<ProgressRecord>, DomainError> {
        self.check()?;
        self.inner.read(key).await
    }

    async fn merge_write(&self, key: &RecordKey, patch: &ProgressPatch) -> Result<(), DomainError> {
        self.check()?;
        self.inner.merge_write(key, patch).await
    }

    async fn merge_write_if(
        &self,
        key: &RecordKey,
        patch: &ProgressPatch,
        guard: WriteGuard,
    ) -> Result<bool, DomainError> {
        self.check()?;
        self.inner.merge_write_if(key, patch, guard).await
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), DomainError> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn subscribe(&self, key: &RecordKey) -> Result<RecordSubscription, DomainError> {
        self.check()?;
        self.inner.subscribe(key).await
    }

    async fn append_attempt(&self, key: &RecordKey, attempt: &AttemptEntry) -> Result<(), DomainError> {
        self.check()?;
        self.inner.append_attempt(key, attempt).await
    }

    async fn recent_attempts(
        &self,
        key: &RecordKey,
        limit: usize,
    ) -> Result<Vec<AttemptEntry>, DomainError> {
        self.check()?;
        self.inner.recent_attempts(key, limit).await
    }

    async fn clear_attempts(&self, key: &RecordKey) -> Result<u64, DomainError> {
        self.check()?;
        self.inner.clear_attempts(key).await
    }
}

/// Another writer's change, slipped in by [`InterferingDocumentStore`].
#[derive(Debug, Clone)]
pub enum Interference {
    /// Merge this patch into the record.
    Write(ProgressPatch),
    /// Delete the record.
    Delete,
}

/// Wraps another store and lets a second writer act right after the
/// first read returns. Models a concurrent device or administrator
/// changing the record between a read and the write that follows it.
pub struct InterferingDocumentStore {
    inner: Arc<dyn ProgressDocumentStore>,
    pending: Mutex<Option<Interference>>,
}

impl InterferingDocumentStore {
    /// Wraps `inner`; `interference` runs once, after the next read.
    #[must_use]
    pub fn new(inner: Arc<dyn ProgressDocumentStore>, interference: Interference) -> Self {
        Self {
            inner,
            pending: Mutex::new(Some(interference)),
        }
    }
}

impl std::fmt::Debug for InterferingDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterferingDocumentStore")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProgressDocumentStore for InterferingDocumentStore {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, DomainError> {
        self.inner.sign_in_anonymously().await
    }

    async fn read(&self, key: &RecordKey) -> Result<Option<ProgressRecord>, DomainError> {
        let snapshot = self.inner.read(key).await?;
        let interference = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        match interference {
            Some(Interference::Write(patch)) => self.inner.merge_write(key, &patch).await?,
            Some(Interference::Delete) => self.inner.delete(key).await?,
            None => {}
        }
        Ok(snapshot)
    }

    async fn merge_write(&self, key: &RecordKey, patch: &ProgressPatch) -> Result<(), DomainError> {
        self.inner.merge_write(key, patch).await
    }

    async fn merge_write_if(
        &self,
        key: &RecordKey,
        patch: &ProgressPatch,
        guard: WriteGuard,
    ) -> Result<bool, DomainError> {
        self.inner.merge_write_if(key, patch, guard).await
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), DomainError> {
        self.inner.delete(key).await
    }

    async fn subscribe(&self, key: &RecordKey) -> Result<RecordSubscription, DomainError> {
        self.inner.subscribe(key).await
    }

    async fn append_attempt(&self, key: &RecordKey, attempt: &AttemptEntry) -> Result<(), DomainError> {
        self.inner.append_attempt(key, attempt).await
    }

    async fn recent_attempts(
        &self,
        key: &RecordKey,
        limit: usize,
    ) -> Result<Vec<AttemptEntry>, DomainError> {
        self.inner.recent_attempts(key, limit).await
    }

    async fn clear_attempts(&self, key: &RecordKey) -> Result<u64, DomainError> {
        self.inner.clear_attempts(key).await
    }
}

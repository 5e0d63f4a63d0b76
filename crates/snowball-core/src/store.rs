//! Shared document store port.
//!
//! The remote side is a generic document store holding exactly one
//! progress record per key plus its attempt sub-collection. Adapters live
//! in `snowball-store`.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DomainError;
use crate::ids::{RecordKey, SessionIdentity};
use crate::record::{AttemptEntry, ProgressPatch, ProgressRecord};

/// Point-in-time view of the record. `None` means the record is absent.
pub type RecordSnapshot = Option<ProgressRecord>;

/// Sending half handed to store adapters that feed a subscription.
pub type SnapshotSender = mpsc::UnboundedSender<RecordSnapshot>;

/// Stream of snapshots for one record key.
///
/// The first snapshot delivered is the record's state at subscription
/// time; every later one follows a mutation, including mutations made by
/// the subscriber itself.
#[derive(Debug)]
pub struct RecordSubscription {
    receiver: mpsc::UnboundedReceiver<RecordSnapshot>,
}

impl RecordSubscription {
    /// Creates a connected sender/subscription pair.
    #[must_use]
    pub fn channel() -> (SnapshotSender, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }

    /// Waits for the next snapshot. Returns `None` once the store side
    /// has gone away.
    pub async fn next(&mut self) -> Option<RecordSnapshot> {
        self.receiver.recv().await
    }
}

/// Preconditions for a conditional merge-write. The store checks them
/// and applies the patch as one atomic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteGuard {
    /// Only merge into an existing record; never create one.
    pub must_exist: bool,
    /// Only merge while the stored furthest step is below this value.
    pub below_step: Option<u32>,
}

impl WriteGuard {
    /// Guard for advancing the furthest step to `step`.
    #[must_use]
    pub fn advancing_to(step: u32, must_exist: bool) -> Self {
        Self {
            must_exist,
            below_step: Some(step),
        }
    }

    /// Whether a record in state `current` may receive the write.
    #[must_use]
    pub fn admits(&self, current: Option<&ProgressRecord>) -> bool {
        match current {
            None => !self.must_exist,
            Some(record) => self
                .below_step
                .is_none_or(|step| record.max_step_reached < step),
        }
    }
}

/// Port over the shared remote document store.
#[async_trait]
pub trait ProgressDocumentStore: Send + Sync {
    /// Performs the anonymous identity handshake.
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, DomainError>;

    /// Reads the record, `None` when it does not exist.
    async fn read(&self, key: &RecordKey) -> Result<Option<ProgressRecord>, DomainError>;

    /// Merges `patch` into the record, creating it if absent.
    async fn merge_write(&self, key: &RecordKey, patch: &ProgressPatch) -> Result<(), DomainError>;

    /// Merges `patch` only when the stored record satisfies `guard`.
    /// Returns whether the write happened.
    async fn merge_write_if(
        &self,
        key: &RecordKey,
        patch: &ProgressPatch,
        guard: WriteGuard,
    ) -> Result<bool, DomainError>;

    /// Deletes the record. Attempts are not touched.
    async fn delete(&self, key: &RecordKey) -> Result<(), DomainError>;

    /// Subscribes to snapshots of the record.
    async fn subscribe(&self, key: &RecordKey) -> Result<RecordSubscription, DomainError>;

    /// Appends an entry to the record's attempt log.
    async fn append_attempt(&self, key: &RecordKey, attempt: &AttemptEntry) -> Result<(), DomainError>;

    /// Returns at most `limit` attempts, newest first.
    async fn recent_attempts(
        &self,
        key: &RecordKey,
        limit: usize,
    ) -> Result<Vec<AttemptEntry>, DomainError>;

    /// Deletes every attempt, returning how many were removed.
    async fn clear_attempts(&self, key: &RecordKey) -> Result<u64, DomainError>;
}

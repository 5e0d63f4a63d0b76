//! In-process implementation of `ProgressDocumentStore`.
//!
//! Several handles (`Arc` clones) may share one store, which is how tests
//! and the offline player model independent devices and an administrator
//! writing to the same record.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use snowball_core::error::DomainError;
use snowball_core::ids::{RecordKey, SessionIdentity};
use snowball_core::record::{AttemptEntry, ProgressPatch, ProgressRecord};
use snowball_core::store::{ProgressDocumentStore, RecordSubscription, SnapshotSender, WriteGuard};

#[derive(Debug, Default)]
struct Document {
    record: Option<ProgressRecord>,
    attempts: Vec<AttemptEntry>,
    subscribers: Vec<SnapshotSender>,
}

impl Document {
    fn notify(&mut self) {
        let snapshot = self.record.clone();
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }
}

/// Document store backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<RecordKey, Document>>,
    next_uid: AtomicU64,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `record` under `key`.
    #[must_use]
    pub fn with_record(key: &RecordKey, record: ProgressRecord) -> Self {
        let store = Self::default();
        store.lock().entry(key.clone()).or_default().record = Some(record);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RecordKey, Document>> {
        // A poisoned map is still structurally valid; keep serving it.
        self.documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ProgressDocumentStore for InMemoryDocumentStore {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, DomainError> {
        let n = self.next_uid.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SessionIdentity::new(format!("anon-{n}")))
    }

    async fn read(&self, key: &RecordKey) -> Result<Option<ProgressRecord>, DomainError> {
        Ok(self.lock().get(key).and_then(|doc| doc.record.clone()))
    }

    async fn merge_write(&self, key: &RecordKey, patch: &ProgressPatch) -> Result<(), DomainError> {
        let mut documents = self.lock();
        let doc = documents.entry(key.clone()).or_default();
        patch.apply_to(doc.record.get_or_insert_with(ProgressRecord::default));
        doc.notify();
        Ok(())
    }

    async fn merge_write_if(
        &self,
        key: &RecordKey,
        patch: &ProgressPatch,
        guard: WriteGuard,
    ) -> Result<bool, DomainError> {
        let mut documents = self.lock();
        let doc = documents.entry(key.clone()).or_default();
        if !guard.admits(doc.record.as_ref()) {
            return Ok(false);
        }
        patch.apply_to(doc.record.get_or_insert_with(ProgressRecord::default));
        doc.notify();
        Ok(true)
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), DomainError> {
        let mut documents = self.lock();
        if let Some(doc) = documents.get_mut(key) {
            if doc.record.take().is_some() {
                doc.notify();
            }
        }
        Ok(())
    }

    async fn subscribe(&self, key: &RecordKey) -> Result<RecordSubscription, DomainError> {
        let (sender, subscription) = RecordSubscription::channel();
        let mut documents = self.lock();
        let doc = documents.entry(key.clone()).or_default();
        // Receiver is alive, the initial send cannot fail.
        let _ = sender.send(doc.record.clone());
        doc.subscribers.push(sender);
        Ok(subscription)
    }

    async fn append_attempt(&self, key: &RecordKey, attempt: &AttemptEntry) -> Result<(), DomainError> {
        self.lock()
            .entry(key.clone())
            .or_default()
            .attempts
            .push(attempt.clone());
        Ok(())
    }

    async fn recent_attempts(
        &self,
        key: &RecordKey,
        limit: usize,
    ) -> Result<Vec<AttemptEntry>, DomainError> {
        let documents = self.lock();
        let Some(doc) = documents.get(key) else {
            return Ok(Vec::new());
        };
        let mut attempts: Vec<AttemptEntry> = doc.attempts.iter().rev().cloned().collect();
        attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        attempts.truncate(limit);
        Ok(attempts)
    }

    async fn clear_attempts(&self, key: &RecordKey) -> Result<u64, DomainError> {
        let mut documents = self.lock();
        let removed = documents
            .get_mut(key)
            .map_or(0, |doc| std::mem::take(&mut doc.attempts).len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

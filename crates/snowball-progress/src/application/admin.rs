//! Administrative console over the shared progress record.

use std::sync::Arc;

use snowball_core::clock::Clock;
use snowball_core::error::DomainError;
use snowball_core::ids::{RecordKey, SectionId};
use snowball_core::store::ProgressDocumentStore;
use snowball_story::SectionGraph;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::application::query_handlers::{self, ProgressOverview};
use crate::domain::commands::{ClearHistory, HardReset, Teleport, UnlockGate};

/// Entry point for the operator: builds commands for the configured
/// record and dispatches them to the handlers.
#[derive(Clone)]
pub struct AdminConsole {
    key: RecordKey,
    graph: Arc<SectionGraph>,
    store: Arc<dyn ProgressDocumentStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AdminConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl AdminConsole {
    #[must_use]
    pub fn new(
        key: RecordKey,
        graph: Arc<SectionGraph>,
        store: Arc<dyn ProgressDocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            key,
            graph,
            store,
            clock,
        }
    }

    /// The section graph the console validates against.
    #[must_use]
    pub fn graph(&self) -> &SectionGraph {
        &self.graph
    }

    /// Opens the gate now.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the write fails.
    pub async fn unlock_gate(&self, correlation_id: Uuid) -> Result<(), DomainError> {
        let command = UnlockGate {
            correlation_id,
            key: self.key.clone(),
        };
        command_handlers::handle_unlock_gate(&command, self.clock.as_ref(), self.store.as_ref()).await
    }

    /// Moves the subject to `section`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown section, or
    /// `DomainError` if the write fails.
    pub async fn teleport(&self, correlation_id: Uuid, section: SectionId) -> Result<(), DomainError> {
        let command = Teleport {
            correlation_id,
            key: self.key.clone(),
            section,
        };
        command_handlers::handle_teleport(
            &command,
            &self.graph,
            self.clock.as_ref(),
            self.store.as_ref(),
        )
        .await
    }

    /// Deletes the attempt log. Returns the number of attempts removed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the deletion fails.
    pub async fn clear_history(&self, correlation_id: Uuid) -> Result<u64, DomainError> {
        let command = ClearHistory {
            correlation_id,
            key: self.key.clone(),
        };
        command_handlers::handle_clear_history(&command, self.store.as_ref()).await
    }

    /// Deletes the attempt log and the record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if either deletion fails.
    pub async fn hard_reset(&self, correlation_id: Uuid) -> Result<u64, DomainError> {
        let command = HardReset {
            correlation_id,
            key: self.key.clone(),
        };
        command_handlers::handle_hard_reset(&command, self.store.as_ref()).await
    }

    /// Current record, path view and recent attempts.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store cannot be read.
    pub async fn overview(&self) -> Result<ProgressOverview, DomainError> {
        query_handlers::get_overview(&self.key, &self.graph, self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use snowball_core::ids::{RecordKey, SectionId};
    use snowball_core::store::ProgressDocumentStore;
    use snowball_store::memory_store::InMemoryDocumentStore;
    use snowball_story::SectionGraph;
    use snowball_test_support::{FixedClock, MemoryCache};
    use uuid::Uuid;

    use super::AdminConsole;
    use crate::application::progress_store::ProgressStore;
    use crate::domain::outcome::RemoteSignal;

    #[tokio::test]
    async fn test_admin_writes_reach_subject_feed_as_foreign_changes() {
        // Arrange
        let remote = Arc::new(InMemoryDocumentStore::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
        let console = AdminConsole::new(
            RecordKey::default(),
            Arc::new(SectionGraph::builtin().unwrap()),
            Arc::clone(&remote) as Arc<dyn ProgressDocumentStore>,
            clock.clone(),
        );
        let device = Arc::new(ProgressStore::new(
            RecordKey::default(),
            Arc::clone(&remote) as Arc<dyn ProgressDocumentStore>,
            Arc::new(MemoryCache::new()),
            clock,
        ));
        device.connect().await;
        let mut feed = device.subscribe().await;

        // Act
        console.unlock_gate(Uuid::new_v4()).await.unwrap();
        console
            .teleport(Uuid::new_v4(), SectionId::from("pause"))
            .await
            .unwrap();
        let first = feed.next().await;
        let second = feed.next().await;

        // Assert
        let Some(RemoteSignal::Changed(first)) = first else {
            panic!("expected a snapshot, got {first:?}");
        };
        assert!(first.gate_unlocked);
        assert!(!device.is_own_write(&first));
        let Some(RemoteSignal::Changed(second)) = second else {
            panic!("expected a snapshot, got {second:?}");
        };
        assert_eq!(second.current_section, Some(SectionId::from("pause")));
    }

    #[tokio::test]
    async fn test_hard_reset_reaches_subject_after_record_existed() {
        // Arrange
        let remote = Arc::new(InMemoryDocumentStore::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
        let console = AdminConsole::new(
            RecordKey::default(),
            Arc::new(SectionGraph::builtin().unwrap()),
            Arc::clone(&remote) as Arc<dyn ProgressDocumentStore>,
            clock.clone(),
        );
        let cache = Arc::new(MemoryCache::new());
        let device = Arc::new(ProgressStore::new(
            RecordKey::default(),
            Arc::clone(&remote) as Arc<dyn ProgressDocumentStore>,
            Arc::clone(&cache) as Arc<dyn snowball_core::cache::LocalCache>,
            clock,
        ));
        device.connect().await;
        device.record_step(1, &SectionId::from("decision")).await;
        let mut feed = device.subscribe().await;
        feed.next().await;

        // Act
        console.hard_reset(Uuid::new_v4()).await.unwrap();
        let signal = feed.next().await;

        // Assert
        assert_eq!(signal, Some(RemoteSignal::HardReset));
        assert_eq!(cache.peek(), None);
        assert!(!console.overview().await.unwrap().exists);
    }
}

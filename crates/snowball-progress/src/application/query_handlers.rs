//! Query handlers for the administrator's overview.

use serde::Serialize;
use snowball_core::error::DomainError;
use snowball_core::ids::RecordKey;
use snowball_core::record::{AttemptEntry, ProgressRecord};
use snowball_core::store::ProgressDocumentStore;
use snowball_story::SectionGraph;
use snowball_story::path::PathView;

/// How many attempts the overview shows.
pub const RECENT_ATTEMPTS_LIMIT: usize = 20;

/// Read-only view of the subject's progress.
#[derive(Debug, Serialize)]
pub struct ProgressOverview {
    /// Whether the record exists at all.
    pub exists: bool,
    /// The record, or the implicit initial state when absent.
    pub record: ProgressRecord,
    /// Per-branch section status derived from the record.
    pub path: PathView,
    /// Most recent attempts, newest first.
    pub attempts: Vec<AttemptEntry>,
}

/// Builds the overview for the record at `key`.
///
/// # Errors
///
/// Returns `DomainError` if the record or its attempts cannot be read.
pub async fn get_overview(
    key: &RecordKey,
    graph: &SectionGraph,
    store: &dyn ProgressDocumentStore,
) -> Result<ProgressOverview, DomainError> {
    let record = store.read(key).await?;
    let exists = record.is_some();
    let record = record.unwrap_or_default();
    let current = record
        .current_section
        .clone()
        .unwrap_or_else(|| graph.start().id.clone());
    let path = graph.path_view(Some(&current), record.max_step_reached);
    let attempts = store.recent_attempts(key, RECENT_ATTEMPTS_LIMIT).await?;
    Ok(ProgressOverview {
        exists,
        record,
        path,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use snowball_core::ids::SectionId;
    use snowball_core::record::AttemptEntry;
    use snowball_store::memory_store::InMemoryDocumentStore;
    use snowball_story::Branch;
    use snowball_story::path::StepStatus;

    use super::*;

    #[tokio::test]
    async fn test_get_overview_of_missing_record_shows_initial_state() {
        // Arrange
        let graph = SectionGraph::builtin().unwrap();
        let store = InMemoryDocumentStore::new();

        // Act
        let overview = get_overview(&RecordKey::default(), &graph, &store).await.unwrap();

        // Assert
        assert!(!overview.exists);
        assert_eq!(overview.record.max_step_reached, 0);
        assert_eq!(overview.path.active_branch, None);
        assert!(overview.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_get_overview_classifies_patient_path() {
        // Arrange
        let graph = SectionGraph::builtin().unwrap();
        let key = RecordKey::default();
        let store = InMemoryDocumentStore::with_record(
            &key,
            ProgressRecord {
                max_step_reached: 4,
                current_section: Some(SectionId::from("riddle-2")),
                ..ProgressRecord::default()
            },
        );

        // Act
        let overview = get_overview(&key, &graph, &store).await.unwrap();

        // Assert
        assert!(overview.exists);
        assert_eq!(overview.path.active_branch, Some(Branch::Patient));
        let patient = overview
            .path
            .branches
            .iter()
            .find(|b| b.branch == Branch::Patient)
            .unwrap();
        let status_of = |id: &str| {
            patient
                .entries
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.status)
                .unwrap()
        };
        assert_eq!(status_of("riddle-1"), StepStatus::Visited);
        assert_eq!(status_of("riddle-2"), StepStatus::Current);
        assert_eq!(status_of("explanation-2"), StepStatus::Locked);
    }

    #[tokio::test]
    async fn test_get_overview_caps_attempts_newest_first() {
        // Arrange
        let graph = SectionGraph::builtin().unwrap();
        let key = RecordKey::default();
        let store = InMemoryDocumentStore::new();
        let base = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        for i in 0..25 {
            store
                .append_attempt(
                    &key,
                    &AttemptEntry {
                        riddle_id: "constancy".into(),
                        raw_answer_text: format!("guess {i}"),
                        is_correct: false,
                        timestamp: base + Duration::minutes(i),
                    },
                )
                .await
                .unwrap();
        }

        // Act
        let overview = get_overview(&key, &graph, &store).await.unwrap();

        // Assert
        assert_eq!(overview.attempts.len(), RECENT_ATTEMPTS_LIMIT);
        assert_eq!(overview.attempts[0].raw_answer_text, "guess 24");
    }
}

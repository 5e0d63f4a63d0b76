//! Administrative commands against the subject's progress record.

use axum::extract::State;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use snowball_core::ids::SectionId;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /teleport.
#[derive(Debug, Deserialize)]
pub struct TeleportRequest {
    /// Section to move the subject to.
    pub section: String,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Correlation id the command was logged under.
    pub correlation_id: Uuid,
}

/// Response body for the deleting commands.
#[derive(Debug, Serialize)]
pub struct DeletionResponse {
    pub correlation_id: Uuid,
    /// Number of attempt entries removed.
    pub attempts_removed: u64,
}

/// POST /unlock-gate
#[instrument(skip(state))]
async fn unlock_gate(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, "handling unlock_gate command");

    state.console.unlock_gate(correlation_id).await?;

    Ok(Json(CommandResponse { correlation_id }))
}

/// POST /teleport
#[instrument(skip(state, request), fields(section = %request.section))]
async fn teleport(
    State(state): State<AppState>,
    Json(request): Json<TeleportRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, "handling teleport command");

    state
        .console
        .teleport(correlation_id, SectionId::new(request.section.trim()))
        .await?;

    Ok(Json(CommandResponse { correlation_id }))
}

/// DELETE /attempts
#[instrument(skip(state))]
async fn clear_history(
    State(state): State<AppState>,
) -> Result<Json<DeletionResponse>, ApiError> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, "handling clear_history command");

    let attempts_removed = state.console.clear_history(correlation_id).await?;

    Ok(Json(DeletionResponse {
        correlation_id,
        attempts_removed,
    }))
}

/// DELETE /progress
#[instrument(skip(state))]
async fn hard_reset(State(state): State<AppState>) -> Result<Json<DeletionResponse>, ApiError> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, "handling hard_reset command");

    let attempts_removed = state.console.hard_reset(correlation_id).await?;

    Ok(Json(DeletionResponse {
        correlation_id,
        attempts_removed,
    }))
}

/// Returns the router for the admin commands.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/unlock-gate", post(unlock_gate))
        .route("/teleport", post(teleport))
        .route("/attempts", delete(clear_history))
        .route("/progress", delete(hard_reset))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use snowball_core::ids::RecordKey;
    use snowball_core::record::{AttemptEntry, ProgressRecord};
    use snowball_core::store::ProgressDocumentStore;
    use snowball_progress::application::admin::AdminConsole;
    use snowball_store::memory_store::InMemoryDocumentStore;
    use snowball_story::SectionGraph;
    use snowball_test_support::{FailingDocumentStore, FixedClock};
    use tower::ServiceExt;

    use super::*;

    fn app_state_with(store: Arc<dyn ProgressDocumentStore>) -> AppState {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
        AppState::new(AdminConsole::new(
            RecordKey::default(),
            Arc::new(SectionGraph::builtin().unwrap()),
            store,
            clock,
        ))
    }

    async fn send(state: AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let app = router().with_state(state);
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_unlock_gate_returns_200_and_marks_record() {
        // Arrange
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = app_state_with(Arc::clone(&store) as Arc<dyn ProgressDocumentStore>);

        // Act
        let (status, json) = send(state, "POST", "/unlock-gate", None).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert!(json["correlation_id"].is_string());
        let record = store.read(&RecordKey::default()).await.unwrap().unwrap();
        assert!(record.gate_unlocked);
        assert_eq!(record.updated_by, None);
    }

    #[tokio::test]
    async fn test_teleport_moves_current_section() {
        // Arrange
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = app_state_with(Arc::clone(&store) as Arc<dyn ProgressDocumentStore>);

        // Act
        let (status, _) = send(
            state,
            "POST",
            "/teleport",
            Some(serde_json::json!({ "section": "riddle-2" })),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        let record = store.read(&RecordKey::default()).await.unwrap().unwrap();
        assert_eq!(record.current_section.unwrap().as_str(), "riddle-2");
    }

    #[tokio::test]
    async fn test_teleport_to_unknown_section_returns_400() {
        let state = app_state_with(Arc::new(InMemoryDocumentStore::new()));

        let (status, json) = send(
            state,
            "POST",
            "/teleport",
            Some(serde_json::json!({ "section": "the-moon" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_teleport_without_body_returns_client_error() {
        let state = app_state_with(Arc::new(InMemoryDocumentStore::new()));

        let (status, _) = send(state, "POST", "/teleport", None).await;

        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_clear_history_reports_removed_attempts() {
        // Arrange
        let key = RecordKey::default();
        let store = Arc::new(InMemoryDocumentStore::new());
        for answer in ["persistence", "constancy"] {
            store
                .append_attempt(
                    &key,
                    &AttemptEntry {
                        riddle_id: "constancy".into(),
                        raw_answer_text: answer.into(),
                        is_correct: answer == "constancy",
                        timestamp: Utc::now(),
                    },
                )
                .await
                .unwrap();
        }
        let state = app_state_with(Arc::clone(&store) as Arc<dyn ProgressDocumentStore>);

        // Act
        let (status, json) = send(state, "DELETE", "/attempts", None).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["attempts_removed"], 2);
        assert!(store.recent_attempts(&key, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hard_reset_deletes_record() {
        // Arrange
        let key = RecordKey::default();
        let store = Arc::new(InMemoryDocumentStore::with_record(
            &key,
            ProgressRecord {
                max_step_reached: 6,
                ..ProgressRecord::default()
            },
        ));
        let state = app_state_with(Arc::clone(&store) as Arc<dyn ProgressDocumentStore>);

        // Act
        let (status, _) = send(state, "DELETE", "/progress", None).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.read(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unlock_gate_returns_500_when_store_fails() {
        let state = app_state_with(Arc::new(FailingDocumentStore));

        let (status, json) = send(state, "POST", "/unlock-gate", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }
}

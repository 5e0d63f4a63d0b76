//! Read-only progress overview for the administrator's viewer.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use snowball_progress::application::query_handlers::ProgressOverview;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /
#[instrument(skip(state))]
async fn get_progress(State(state): State<AppState>) -> Result<Json<ProgressOverview>, ApiError> {
    let overview = state.console.overview().await?;
    Ok(Json(overview))
}

/// Returns the router for the progress overview.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_progress))
}

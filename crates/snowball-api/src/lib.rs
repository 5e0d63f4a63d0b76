//! Snowball API: admin HTTP surface and the terminal player.
//!
//! The library exposes the router, its state and error mapping so that
//! the binaries and the integration tests assemble the same application.

pub mod config;
pub mod error;
pub mod player;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the full admin router over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/progress", routes::progress::router())
        .nest("/api/v1/admin", routes::admin::router())
        .with_state(state)
}

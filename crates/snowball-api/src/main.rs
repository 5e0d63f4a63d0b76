//! Snowball admin API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use snowball_api::config::ApiConfig;
use snowball_api::error::AppError;
use snowball_api::state::AppState;
use snowball_api::{app, telemetry};
use snowball_core::clock::SystemClock;
use snowball_progress::application::admin::AdminConsole;
use snowball_store::pg_document_store::PgDocumentStore;
use snowball_story::SectionGraph;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ApiConfig::from_env()?;
    let tracer_provider = telemetry::init_server("snowball-api", config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Snowball admin API server");

    let graph = SectionGraph::load(config.story.story_path.as_deref()).map_err(AppError::from)?;

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(AppError::from)?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(AppError::from)?;

    let console = AdminConsole::new(
        config.story.record_key.clone(),
        Arc::new(graph),
        Arc::new(PgDocumentStore::new(pool)),
        Arc::new(SystemClock),
    );

    // The viewer is served from another origin.
    let router = app(AppState::new(console))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!(record_key = %config.story.record_key, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    if let Some(provider) = tracer_provider {
        provider.shutdown()?;
    }
    Ok(())
}

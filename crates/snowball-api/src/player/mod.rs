//! Terminal player: one subject's device, driven from the keyboard.

pub mod input;
pub mod judge;
pub mod terminal;

use std::sync::Arc;

use snowball_core::cache::LocalCache;
use snowball_core::clock::{Clock, SystemClock};
use snowball_core::store::ProgressDocumentStore;
use snowball_navigation::application::gate::gate_channel;
use snowball_navigation::application::machine::{Collaborators, NavigationMachine};
use snowball_navigation::application::router::HashRouter;
use snowball_navigation::application::session::Session;
use snowball_progress::application::progress_store::ProgressStore;
use snowball_store::file_cache::JsonFileCache;
use snowball_store::http_time::HttpTimeSource;
use snowball_store::memory_store::InMemoryDocumentStore;
use snowball_store::pg_document_store::PgDocumentStore;
use snowball_story::SectionGraph;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::PlayerConfig;
use crate::error::AppError;
use crate::player::input::{SharedAddressBar, read_lines};
use crate::player::judge::ManifestJudge;
use crate::player::terminal::{LoggedNarration, TerminalRenderer};

fn remote_store(config: &PlayerConfig) -> Result<Arc<dyn ProgressDocumentStore>, AppError> {
    let Some(url) = &config.database_url else {
        info!("DATABASE_URL not set, progress is kept in memory");
        return Ok(Arc::new(InMemoryDocumentStore::new()));
    };
    // Lazy, so an unreachable database degrades to local progress.
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(config.remote_timeout)
        .connect_lazy(url)?;
    Ok(Arc::new(PgDocumentStore::new(pool)))
}

/// Runs a player session on stdin/stdout until input ends or the
/// subject quits.
///
/// # Errors
///
/// Returns `AppError` if the story cannot be loaded or the stores cannot
/// be set up.
pub async fn run(config: PlayerConfig) -> Result<(), AppError> {
    let graph = Arc::new(SectionGraph::load(config.story.story_path.as_deref())?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache: Arc<dyn LocalCache> = Arc::new(JsonFileCache::new(&config.cache_path));

    let progress = Arc::new(
        ProgressStore::new(
            config.story.record_key.clone(),
            remote_store(&config)?,
            cache,
            Arc::clone(&clock),
        )
        .with_timeout(config.remote_timeout),
    );
    progress.connect().await;
    let initial = progress.load_initial().await;
    info!(
        max_step = initial.max_step_reached,
        source = ?initial.source,
        "progress loaded"
    );

    let (gate_tx, gate_rx) = gate_channel();
    let machine = NavigationMachine::new(
        Arc::clone(&graph),
        progress,
        Collaborators {
            renderer: Box::new(TerminalRenderer::new(std::io::stdout(), Arc::clone(&clock))),
            narration: Box::new(LoggedNarration::new()),
            judge: Arc::new(ManifestJudge::new(Arc::clone(&graph))),
            time: Arc::new(HttpTimeSource::new(config.time_url.clone(), config.remote_timeout)?),
            clock,
        },
        gate_tx,
        &initial,
    )
    .with_gate_poll(config.gate_poll);

    let bar = SharedAddressBar::new();
    let mut session = Session::new(machine, HashRouter::new(bar.clone()), gate_rx);
    session.boot(initial.current_section.as_ref()).await;

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(read_lines(tokio::io::stdin(), bar, tx));
    session.run(rx).await;
    Ok(())
}

//! Snowball terminal player entry point.

use std::error::Error;

use snowball_api::config::PlayerConfig;
use snowball_api::{player, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    telemetry::init_player();
    let config = PlayerConfig::from_env()?;
    tracing::info!(record_key = %config.story.record_key, "Starting Snowball player");
    player::run(config).await?;
    Ok(())
}

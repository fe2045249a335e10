//! Giveaway Picker Server
//!
//! Serves the draw endpoint and the local draw history.

use std::sync::Arc;

use anyhow::Context;
use giveaway_picker::{config, Config, Credentials, DrawLedger, GiveawayPicker};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Giveaway Picker Server");

    // Credentials may live in a local .env file
    config::load_dotenv();

    let config = Config::load()?;

    let ledger = Arc::new(
        DrawLedger::open(&config.database.path)
            .with_context(|| format!("Failed to open ledger {}", config.database.path))?,
    );
    info!(
        "Draw ledger ready at {} ({} draws recorded)",
        config.database.path,
        ledger.total_draws()?
    );

    // Missing credentials are reported per request, not at startup
    let picker = GiveawayPicker::new(ledger, config.bluesky.clone(), Credentials::from_env());

    giveaway_picker::server::run_server(&config.bind_addr(), picker).await?;

    Ok(())
}

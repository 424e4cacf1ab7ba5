//! Mitosis arena game server.

use std::sync::Arc;
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

    info!("Mitosis arena server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Map: {}x{}", config.map.width, config.map.height);
    info!("  Food target: {}", config.map.food_count);

    let accounts = Arc::new(server::MemoryAccounts::new());

    // Start the game server
    server::run(config, accounts).await?;

    Ok(())
}

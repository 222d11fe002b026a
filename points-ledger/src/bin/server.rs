//! Points ledger server binary

use anyhow::Context;
use points_ledger::{actor::spawn_ledger_actor, clock::SystemClock, Config, Ledger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting points ledger server");

    // Load configuration: file first, environment on top
    let config = match std::env::var("POINTS_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?
            .with_env_overrides()?,
        Err(_) => Config::from_env()?,
    };

    let ledger = Ledger::from_config(&config, Arc::new(SystemClock))
        .context("opening ledger")?;
    tracing::info!(
        admin = %ledger.admin(),
        customers = ledger.registered_customers().len(),
        supply = ledger.total_supply(),
        "Ledger opened successfully"
    );

    let handle = spawn_ledger_actor(ledger, config.actor.mailbox_capacity);

    tokio::signal::ctrl_c().await?;

    let ledger = handle.shutdown().await?;
    tracing::info!(supply = ledger.total_supply(), "Shutting down points ledger server");
    Ok(())
}

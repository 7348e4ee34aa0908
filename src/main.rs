//! Solana MEV Simulator - Main Entry Point
//!
//! Runs the simulation engine until Ctrl+C, printing each published opportunity
//! set and every simulated trade.

use solana_mev_sim::*;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use solana_mev_sim::storage::{FileStore, UserSettings};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = Config::load();
    let output_root = config.output_dir.clone().unwrap_or_else(|| PathBuf::from("output"));

    // Initialize logging
    utils::setup_output_directories(&output_root)?;
    let _logging_guard = utils::setup_logging(&output_root.join("logs"))?;

    if let Some(path) = &config.settings_path {
        let store = FileStore::open(path)?;
        let settings = UserSettings::load(&store)?;
        info!("📂 Loaded user settings from {}", path.display());
        config.apply_settings(&settings);
    }
    config.output_dir = Some(output_root);

    info!("🪐 Solana MEV Simulator v{}", env!("CARGO_PKG_VERSION"));
    utils::print_configuration(&config);

    let random = SharedRandom::from_optional_seed(config.random_seed);
    let engine = SimulationEngine::new(config, random)?;
    let mut events = engine.subscribe();

    // Setup shutdown handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("\n📛 Received shutdown signal (Ctrl+C)...");
        let _ = shutdown_tx.send(());
    });

    let start_time = Instant::now();
    let mut ticks_with_opportunities = 0u64;
    engine.start().await?;
    info!("\n🚀 Starting simulation loop...\n");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(EngineEvent::OpportunitiesUpdated(set)) => {
                    if !set.is_empty() {
                        ticks_with_opportunities += 1;
                    }
                    utils::print_opportunity_set(&set);
                }
                Ok(EngineEvent::TradeExecuted(outcome)) => utils::print_trade_outcome(&outcome),
                Ok(EngineEvent::PricesUpdated(snapshot)) => utils::print_prices(&snapshot),
                Ok(EngineEvent::GasUpdated(status)) => utils::print_gas_status(&status),
                Err(RecvError::Lagged(skipped)) => warn!("⚠️ Display lagged, skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, exiting main loop...");
                break;
            }
        }
    }

    engine.stop().await?;
    utils::print_session_stats(start_time, ticks_with_opportunities, &engine.stats().await);
    info!("👋 Simulator shutdown complete");

    Ok(())
}

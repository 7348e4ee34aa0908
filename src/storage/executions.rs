//! Trade outcome storage

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use crate::types::TradeOutcome;

pub fn trade_log_path(root: &Path) -> PathBuf {
    root.join("executions")
        .join(format!("trades_{}.jsonl", Utc::now().format("%Y-%m-%d")))
}

pub fn save_trade_outcome(root: &Path, outcome: &TradeOutcome) -> Result<()> {
    let filename = trade_log_path(root);
    if let Some(parent) = filename.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(outcome)?)?;

    info!(
        trade_id = %outcome.id,
        opportunity_id = %outcome.opportunity_id,
        success = outcome.success,
        realized_pnl = %outcome.realized_pnl,
        "Saved trade outcome"
    );

    Ok(())
}

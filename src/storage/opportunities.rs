//! Published opportunity storage

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use crate::types::OpportunitySet;

pub fn opportunity_log_path(root: &Path) -> PathBuf {
    root.join("opportunities")
        .join(format!("arbitrage_{}.jsonl", Utc::now().format("%Y-%m-%d")))
}

/// Appends one line per published set. Empty sets are skipped.
pub fn save_opportunity_set(root: &Path, set: &OpportunitySet) -> Result<()> {
    if set.is_empty() {
        return Ok(());
    }
    let filename = opportunity_log_path(root);
    if let Some(parent) = filename.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(set)?)?;

    info!(
        simple = set.simple.len(),
        triangular = set.triangular.len(),
        complex = set.complex.len(),
        best_profit = ?set.best().map(|o| o.profit_percent()),
        "Saved opportunity set"
    );

    Ok(())
}

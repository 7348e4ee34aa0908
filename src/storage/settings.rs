//! Key-value settings file and persisted user settings

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use crate::{
    config::{
        DEFAULT_GAS_LIMIT, DEFAULT_MAX_TRANSACTION_SIZE, DEFAULT_MIN_PROFIT_THRESHOLD_PCT,
    },
    errors::{SimError, SimResult},
    types::RiskProfile,
};

pub const USER_SETTINGS_KEY: &str = "user-settings";

/// A JSON object persisted to one file. Every `set` rewrites the file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: serde_json::Map<String, serde_json::Value>,
}

impl FileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))
                .map_err(|e| SimError::storage("Failed to read settings store", e))?;
            if raw.trim().is_empty() {
                serde_json::Map::new()
            } else {
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))
                    .map_err(|e| SimError::storage("Settings store is not a JSON object", e))?
            }
        } else {
            serde_json::Map::new()
        };
        debug!(path = %path.display(), keys = values.len(), "Opened settings store");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SimResult<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| SimError::storage(format!("Invalid value stored under {}", key), e)),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> SimResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| SimError::storage(format!("Failed to serialize {}", key), e))?;
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> SimResult<bool> {
        let removed = self.values.remove(key).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    fn flush(&self) -> SimResult<()> {
        let write = || -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let body = serde_json::to_string_pretty(&self.values)?;
            fs::write(&self.path, body)?;
            Ok(())
        };
        write().map_err(|e| SimError::storage(format!("Failed to write {}", self.path.display()), e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub risk_profile: RiskProfile,
    pub min_profit_threshold: Decimal,
    pub max_transaction_size: Decimal,
    pub gas_limit: u32,
    pub auto_execute: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            risk_profile: RiskProfile::Moderate,
            min_profit_threshold: DEFAULT_MIN_PROFIT_THRESHOLD_PCT,
            max_transaction_size: DEFAULT_MAX_TRANSACTION_SIZE,
            gas_limit: DEFAULT_GAS_LIMIT,
            auto_execute: false,
        }
    }
}

impl UserSettings {
    /// Stored settings, or defaults when nothing has been saved yet.
    pub fn load(store: &FileStore) -> SimResult<Self> {
        Ok(store.get(USER_SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, store: &mut FileStore) -> SimResult<()> {
        store.set(USER_SETTINGS_KEY, self)?;
        info!(
            risk_profile = %self.risk_profile,
            min_profit_threshold = %self.min_profit_threshold,
            auto_execute = self.auto_execute,
            "Saved user settings"
        );
        Ok(())
    }
}

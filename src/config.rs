use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Runtime settings for the server and the CLI.
///
/// Loaded from a JSON file; any field left out takes its default. A handful
/// of environment variables override the file:
///
/// | variable | field |
/// |---|---|
/// | `LEDGER_PATH` | `ledger_path` |
/// | `LEDGER_BIND_ADDR` | `bind_addr` |
/// | `LEDGER_CACHE_TTL` | `cache_ttl_secs` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CSV file holding the transaction ledger.
    pub ledger_path: PathBuf,
    /// Directory holding one CSV per agreement sheet plus the index.
    pub agreements_dir: PathBuf,
    /// Client intake CSV.
    pub intake_path: PathBuf,
    pub bind_addr: String,
    /// Lifetime of cached ledger reads, in seconds. 0 disables the cache.
    pub cache_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            ledger_path: PathBuf::from("data/ledger.csv"),
            agreements_dir: PathBuf::from("data/agreements"),
            intake_path: PathBuf::from("data/intake.csv"),
            bind_addr: "127.0.0.1:3000".to_string(),
            cache_ttl_secs: 5,
        }
    }
}

impl AppConfig {
    /// Read `path`, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| LedgerError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let mut config = Self::from_json(&text).map_err(|detail| LedgerError::Config {
            path: path.to_path_buf(),
            detail,
        })?;
        config.apply_env(|key| env::var(key).ok());
        debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file means defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        debug!("no config at {}, using defaults", path.display());
        let mut config = AppConfig::default();
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    fn from_json(text: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    /// Apply overrides looked up through `lookup`.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("LEDGER_PATH").filter(|v| !v.trim().is_empty()) {
            self.ledger_path = PathBuf::from(path.trim());
        }
        if let Some(addr) = lookup("LEDGER_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(ttl) = lookup("LEDGER_CACHE_TTL") {
            match ttl.trim().parse() {
                Ok(secs) => self.cache_ttl_secs = secs,
                Err(_) => warn!("ignoring LEDGER_CACHE_TTL='{}', not a number of seconds", ttl),
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// CSV file for the agreement sheet `name`.
    pub fn agreement_sheet_path(&self, name: &str) -> PathBuf {
        self.agreements_dir.join(format!("{}.csv", name))
    }
}

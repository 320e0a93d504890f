//! # Configuration
//!
//! Environment-driven settings for the reminder core and its console host.
//! Every value has a default, so a bare environment works out of the box.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Minimum spacing between repeated alerts for an unacknowledged timer
pub const DEFAULT_REALERT_INTERVAL_SECS: u64 = 5 * 60;

/// Cadence of the background sweep over all user timers
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Directory the console host persists per-user timer files into
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum spacing between re-alerts for ack-required timers
    pub realert_interval: Duration,
    /// How often the sweep task scans for due timers
    pub sweep_interval: Duration,
    /// Where per-user timer files are stored
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            realert_interval: Duration::from_secs(DEFAULT_REALERT_INTERVAL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self> {
        let realert_secs = env_secs("CHIME_REALERT_INTERVAL_SECS", DEFAULT_REALERT_INTERVAL_SECS)?;
        let sweep_secs = env_secs("CHIME_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let data_dir = std::env::var("CHIME_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Config {
            realert_interval: Duration::from_secs(realert_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
            data_dir,
        })
    }
}

fn env_secs(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a number of seconds, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

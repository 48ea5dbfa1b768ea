//! Daemon configuration.

use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Main daemon configuration, loaded from a JSON file. Every field has a
/// default so a missing or partial file still yields a runnable daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Applicant key this daemon allocates identifiers under.
    #[serde(default = "default_applicant_key")]
    pub applicant_key: String,
    /// Participant name embedded in receipt file names.
    #[serde(default = "default_participant_name")]
    pub participant_name: String,

    /// Root directory for the database and the outbox.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory uploads are dropped into. Relative paths resolve against
    /// the working directory, not `data_dir`.
    #[serde(default = "default_drop_dir")]
    pub delivery_drop_dir: PathBuf,

    /// Delivery attempts before a receipt moves to `failed/`.
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,
    /// Seconds between retry sweeps.
    #[serde(default = "default_retry_sweep_interval_secs")]
    pub retry_sweep_interval_secs: u64,

    /// Seconds before the first shipment batch after startup.
    #[serde(default = "default_shipment_initial_delay_secs")]
    pub shipment_initial_delay_secs: u64,
    /// Seconds between shipment batches.
    #[serde(default = "default_shipment_interval_secs")]
    pub shipment_interval_secs: u64,
    /// Orders claimed per shipment batch.
    #[serde(default = "default_shipment_fetch_limit")]
    pub shipment_fetch_limit: usize,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_applicant_key() -> String {
    "LOCAL".to_string()
}

fn default_participant_name() -> String {
    "LOCAL".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("orderd-data")
}

fn default_drop_dir() -> PathBuf {
    PathBuf::from("orderd-data/remote-drop")
}

fn default_max_delivery_attempts() -> u32 {
    10
}

fn default_retry_sweep_interval_secs() -> u64 {
    60
}

fn default_shipment_initial_delay_secs() -> u64 {
    30
}

fn default_shipment_interval_secs() -> u64 {
    300
}

fn default_shipment_fetch_limit() -> usize {
    200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            applicant_key: default_applicant_key(),
            participant_name: default_participant_name(),
            data_dir: default_data_dir(),
            delivery_drop_dir: default_drop_dir(),
            max_delivery_attempts: default_max_delivery_attempts(),
            retry_sweep_interval_secs: default_retry_sweep_interval_secs(),
            shipment_initial_delay_secs: default_shipment_initial_delay_secs(),
            shipment_interval_secs: default_shipment_interval_secs(),
            shipment_fetch_limit: default_shipment_fetch_limit(),
        }
    }
}

impl Config {
    /// Load from a file if it exists, defaults otherwise, then apply
    /// environment overrides.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        Ok(config)
    }

    /// Load from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Only the log level can be overridden at runtime.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("ORDERD_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("orders.db")
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.data_dir.join("outbox")
    }
}

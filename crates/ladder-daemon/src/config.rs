//! Configuration file management.

use std::path::PathBuf;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "LADDER_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Ledger store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Accrual timer settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Ledger store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Accrual timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run the in-process accrual timer. Disable when an external
    /// scheduler calls `maybe_run_daily_accrual` instead.
    #[serde(default = "default_true")]
    pub timer_enabled: bool,
    /// Seconds between scheduler checks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Operating timezone as minutes east of UTC. `automatic_income_time`
    /// and the once-per-day stamp are interpreted in this zone.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timer_enabled: true,
            tick_interval_secs: default_tick_interval(),
            utc_offset_minutes: 0,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl ScheduleConfig {
    /// The operating timezone.
    pub fn timezone(&self) -> anyhow::Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                anyhow::anyhow!("utc_offset_minutes out of range: {}", self.utc_offset_minutes)
            })
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            config.schedule.timezone()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.store.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.store.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Ladder")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".ladder")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/ladder"))
}

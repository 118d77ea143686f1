//! Bus configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Service-level settings
    #[serde(default)]
    pub service: ServiceSettings,
    /// Per-device queue sizing
    #[serde(default)]
    pub queues: QueueSettings,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            queues: QueueSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "ServiceSettings::default_log_level")]
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl ServiceSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

/// Depths of the per-device request queues
///
/// Every depth must be at least 1; queue creation fails otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Maximum host read requests parked while no report data is available
    #[serde(default = "QueueSettings::default_data_depth")]
    pub data_depth: usize,
    /// Maximum produced reports buffered while no host read is parked
    #[serde(default = "QueueSettings::default_ready_report_depth")]
    pub ready_report_depth: usize,
    /// Maximum management requests parked on the notification queue
    #[serde(default = "QueueSettings::default_notification_depth")]
    pub notification_depth: usize,
    /// Maximum lifecycle events buffered while no management request waits
    #[serde(default = "QueueSettings::default_notification_event_depth")]
    pub notification_event_depth: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            data_depth: Self::default_data_depth(),
            ready_report_depth: Self::default_ready_report_depth(),
            notification_depth: Self::default_notification_depth(),
            notification_event_depth: Self::default_notification_event_depth(),
        }
    }
}

impl QueueSettings {
    fn default_data_depth() -> usize {
        64
    }

    fn default_ready_report_depth() -> usize {
        16
    }

    fn default_notification_depth() -> usize {
        32
    }

    fn default_notification_event_depth() -> usize {
        16
    }
}

impl BusConfig {
    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("vpad-bus").join("config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: BusConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the given path, or fall back to defaults when
    /// no file exists there
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configured values
    pub fn validate(&self) -> Result<()> {
        let depths = [
            ("queues.data_depth", self.queues.data_depth),
            ("queues.ready_report_depth", self.queues.ready_report_depth),
            ("queues.notification_depth", self.queues.notification_depth),
            (
                "queues.notification_event_depth",
                self.queues.notification_event_depth,
            ),
        ];
        for (name, depth) in depths {
            if depth == 0 {
                return Err(anyhow!("{} must be at least 1", name));
            }
        }
        Ok(())
    }
}

//! Bus configuration loaded from TOML.
//!
//! ```toml
//! default_queue = "jobs"
//!
//! [logging]
//! enabled = true
//! log_payloads = false
//!
//! [worker]
//! poll_interval_ms = 50
//! reapply_middleware = true
//!
//! [commands."order.create"]
//! in_transaction = false
//! ```
//!
//! Every section is optional.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Queue used for deferred commands that name none.
    pub default_queue: String,
    pub logging: LoggingConfig,
    pub worker: WorkerConfig,
    /// Per-command overrides, keyed by command name.
    pub commands: BTreeMap<String, CommandConfig>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_queue: default_queue(),
            logging: LoggingConfig::default(),
            worker: WorkerConfig::default(),
            commands: BTreeMap::new(),
        }
    }
}

impl BusConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BusConfig = toml::from_str(content)?;
        Ok(config)
    }
}

fn default_queue() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Install `LoggingMiddleware` as the outermost interceptor.
    pub enabled: bool,
    /// Include request bodies in start events.
    pub log_payloads: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_payloads: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub poll_interval_ms: u64,
    /// Run deferred jobs inside the middleware pipeline captured at dispatch.
    pub reapply_middleware: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            reapply_middleware: false,
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Overrides the transaction flag chosen at registration.
    pub in_transaction: Option<bool>,
}

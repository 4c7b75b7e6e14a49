//! Configuration schema definitions.
//!
//! This module defines the process configuration for the filter.
//! All types derive Serde traits for deserialization from config files.
//! Routing rules live in their own JSON file (see `rules`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the rule file and ledger by default.
pub const PROJECT_DIR: &str = ".KinectExperiment";

/// Default rule file name inside the project directory.
pub const RULE_FILE_NAME: &str = ".RULE";

/// Default ledger snapshot name inside the project directory.
pub const LEDGER_FILE_NAME: &str = "DELAY_LEDGER.json";

/// Root configuration for the filter.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Rule file location.
    pub rules: RulesConfig,

    /// Delay ledger persistence.
    pub ledger: LedgerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request limits.
    pub security: SecurityConfig,
}

impl FilterConfig {
    /// Resolved ledger snapshot path.
    pub fn ledger_path(&self) -> PathBuf {
        match &self.ledger.path {
            Some(path) => path.clone(),
            None => self
                .rules
                .path
                .parent()
                .unwrap_or(Path::new(""))
                .join(LEDGER_FILE_NAME),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "[::]:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "[::]:5000".to_string(),
        }
    }
}

/// Rule file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Path to the JSON rule file.
    pub path: PathBuf,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: project_dir().join(RULE_FILE_NAME),
        }
    }
}

/// Delay ledger configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Snapshot file. Unset means `DELAY_LEDGER.json` beside the rule file;
    /// an empty path keeps the ledger in memory only.
    pub path: Option<PathBuf>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound forward timeout (connect + response) in seconds.
    pub forward_secs: u64,

    /// Inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            forward_secs: 10,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024 * 1024, // 16MB, room for a depth frame
        }
    }
}

/// Per-user project directory, `$HOME/.KinectExperiment` (or the roaming
/// app data directory on Windows). Falls back to the working directory.
pub fn project_dir() -> PathBuf {
    let home = if cfg!(windows) {
        std::env::var_os("HOMEPATH")
            .map(|h| PathBuf::from(h).join("AppData").join("Roaming").join("KinectExperiment"))
    } else {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(PROJECT_DIR))
    };
    home.unwrap_or_else(|| PathBuf::from("."))
}

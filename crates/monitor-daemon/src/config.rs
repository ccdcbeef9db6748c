//! # Daemon Configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ENFORCER_MONITOR_SOCKET` | `/var/run/enforcer/monitor.sock` |
//! | `ENFORCER_CONTEXT_STORE` | `/var/run/enforcer/contexts` |
//! | `ENFORCER_METRICS_FILE` | unset (no metrics dump) |

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_MONITOR_SOCKET: &str = "/var/run/enforcer/monitor.sock";
pub const DEFAULT_CONTEXT_STORE: &str = "/var/run/enforcer/contexts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Unix socket the monitor listens on.
    pub rpc_address: String,
    /// Base directory of the context store.
    pub store_dir: PathBuf,
    /// Where the Prometheus text dump is written on shutdown.
    pub metrics_file: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rpc_address: DEFAULT_MONITOR_SOCKET.to_string(),
            store_dir: PathBuf::from(DEFAULT_CONTEXT_STORE),
            metrics_file: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("monitor socket path is empty")]
    EmptySocket,

    #[error("context store directory is empty")]
    EmptyStoreDir,
}

impl DaemonConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(socket) = std::env::var("ENFORCER_MONITOR_SOCKET") {
            config.rpc_address = socket;
        }
        if let Ok(dir) = std::env::var("ENFORCER_CONTEXT_STORE") {
            config.store_dir = PathBuf::from(dir);
        }
        if let Ok(file) = std::env::var("ENFORCER_METRICS_FILE") {
            if !file.is_empty() {
                config.metrics_file = Some(PathBuf::from(file));
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_address.trim().is_empty() {
            return Err(ConfigError::EmptySocket);
        }
        if self.store_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoreDir);
        }
        Ok(())
    }
}

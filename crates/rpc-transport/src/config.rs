//! Transport configuration.

use std::time::Duration;

/// Dial attempts made before `connect` gives up.
pub const DEFAULT_MAX_RETRIES: u32 = 1000;

/// Pause between two dial attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// Environment variable overriding [`DEFAULT_MAX_RETRIES`].
pub const ENV_RETRY_COUNT: &str = "REMOTE_RPCRETRIES";

/// Dial policy for outbound sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum number of dial attempts per `connect`.
    pub max_retries: u32,
    /// Fixed backoff between attempts.
    pub retry_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl TransportConfig {
    /// Load configuration from the environment.
    ///
    /// Reads `REMOTE_RPCRETRIES` once. Unset or unparseable values fall back
    /// to the default.
    pub fn from_env() -> Self {
        Self::from_retry_setting(std::env::var(ENV_RETRY_COUNT).ok().as_deref())
    }

    /// Build a configuration from a raw retry-count setting.
    pub fn from_retry_setting(value: Option<&str>) -> Self {
        let max_retries = value
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        Self {
            max_retries,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Total dial attempts. A zero budget still dials once.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

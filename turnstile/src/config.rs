//! Strategy configuration.
//!
//! One rule applies uniformly to every key handled by the strategy it builds.
//!
//! ```yaml
//! strategy: fixed_window
//! max_requests: 5
//! window: 10s
//! ```
//!
//! ```yaml
//! strategy: token_bucket
//! capacity: 5
//! refill_rate: 1.0
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::ConfigError;
use crate::FixedWindow;
use crate::Strategy;
use crate::TokenBucket;

/// Which strategy to build, and its quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LimitConfig {
    FixedWindow {
        /// Requests a key may make per window
        max_requests: usize,
        /// Window length, written as a humantime string such as `10s` or `1m 30s`
        #[serde(with = "humantime_duration")]
        window: Duration,
    },
    TokenBucket {
        /// Tokens a key's bucket holds when full
        capacity: usize,
        /// Tokens credited per second
        refill_rate: f64,
    },
}

impl LimitConfig {
    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Checks the quota without keeping the strategy around.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }

    /// Builds the configured strategy.
    ///
    /// # Errors
    ///
    /// Any zero or non-positive quota value is rejected, never clamped.
    pub fn build(&self) -> Result<Arc<dyn Strategy + Send + Sync>, ConfigError> {
        Ok(match *self {
            LimitConfig::FixedWindow {
                max_requests,
                window,
            } => Arc::new(FixedWindow::new(max_requests, window)?),
            LimitConfig::TokenBucket {
                capacity,
                refill_rate,
            } => Arc::new(TokenBucket::new(capacity, refill_rate)?),
        })
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use serde::de::Error;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}

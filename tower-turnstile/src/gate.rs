use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use turnstile::ConfigError;
use turnstile::LimitConfig;
use turnstile::Reason;
use turnstile::Strategy;

/// The request-handling front of a configured strategy.
///
/// A `Gate` is built once and handed to whatever handles requests; clones share
/// the same strategy and therefore the same per-key quotas. Each decision is
/// reported through `tracing`.
#[derive(Debug, Clone)]
pub struct Gate {
    strategy: Arc<dyn Strategy + Send + Sync>,
}

impl Gate {
    pub fn new(strategy: Arc<dyn Strategy + Send + Sync>) -> Self {
        Self { strategy }
    }

    /// Builds the strategy described by `config` and binds a gate to it.
    pub fn from_config(config: &LimitConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.build()?))
    }

    pub fn strategy(&self) -> &Arc<dyn Strategy + Send + Sync> {
        &self.strategy
    }

    /// Decides one request from `key`, returning `true` if it may proceed.
    pub fn handle_request(&self, key: &str) -> bool {
        match self.strategy.process(key) {
            ControlFlow::Continue(()) => {
                debug!(key, "Request allowed");
                true
            }
            ControlFlow::Break(Reason::Overloaded { retry_after }) => {
                info!(key, ?retry_after, "Request rejected: rate limit exceeded");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quanta::Clock;
    use turnstile::TokenBucket;

    use super::*;

    #[test]
    fn test_gate_forwards_decisions() {
        let (clock, mock) = Clock::mock();
        let bucket = TokenBucket::with_clock(2, 1.0, clock).unwrap();
        let gate = Gate::new(Arc::new(bucket));

        assert!(gate.handle_request("user456"));
        assert!(gate.handle_request("user456"));
        assert!(!gate.handle_request("user456"));

        mock.increment(Duration::from_secs(1));
        assert!(gate.handle_request("user456"));
    }

    #[test]
    fn test_clones_share_quota() {
        let config = LimitConfig::FixedWindow {
            max_requests: 1,
            window: Duration::from_secs(60),
        };
        let gate = Gate::from_config(&config).unwrap();
        let clone = gate.clone();

        assert!(gate.handle_request("user123"));
        assert!(!clone.handle_request("user123"));
        assert!(Arc::ptr_eq(gate.strategy(), clone.strategy()));
    }

    #[test]
    fn test_from_config_fails_fast() {
        let config = LimitConfig::TokenBucket {
            capacity: 0,
            refill_rate: 1.0,
        };
        assert!(matches!(
            Gate::from_config(&config),
            Err(ConfigError::ZeroCapacity)
        ));
    }
}

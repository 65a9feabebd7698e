/// Errors produced while building a strategy.
///
/// Once a strategy exists it cannot fail: every later call to
/// [`crate::Strategy::admit`] returns a definite answer.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A fixed window must admit at least one request.
    #[error("max_requests must be greater than zero")]
    ZeroMaxRequests,

    /// A fixed window must span some time.
    #[error("window must be longer than zero")]
    ZeroWindow,

    /// A token bucket must hold at least one token.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    /// The refill rate must be a finite, positive number of tokens per second.
    #[error("refill_rate must be a finite positive number, got {0}")]
    InvalidRefillRate(f64),

    /// The configuration document could not be parsed.
    #[error("invalid limit configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

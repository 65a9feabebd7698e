//! # turnstile
//!
//! `turnstile` provides per-key admission control strategies: given a client key,
//! decide whether the client's current request fits inside its quota.
//!
//! ## Core Philosophy
//!
//! Every key owns a small accounting record. Callers for the same key are
//! serialized on that record's lock; callers for different keys never touch the
//! same lock. The map from key to record is sharded, and its lock is only held
//! for the lookup or insert, never for the accounting itself.
//!
//! ## Key Concepts
//!
//! * **Per-Key Serialization**: the read-check-mutate step of each strategy runs
//!   as one indivisible unit per record.
//! * **Lazy Evaluation**: windows and tokens are recalculated at the moment of the
//!   request, eliminating the need for background worker threads or timers.
//! * **Strategy Trait**: a unified interface for different limiting algorithms,
//!   chosen once at construction time.
//!
//! ## Example
//!
//! ```rust
//! use turnstile::Strategy;
//! use turnstile::TokenBucket;
//!
//! let bucket = TokenBucket::new(5, 1.0).unwrap();
//!
//! if bucket.admit("user123") {
//!     // Request allowed
//! }
//! ```

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

pub mod config;
mod error;
mod fixed_window;
pub mod store;
mod token_bucket;

pub use config::LimitConfig;
pub use error::ConfigError;
pub use fixed_window::FixedWindow;
pub use fixed_window::Window;
pub use store::KeyStore;
pub use store::ShardedStore;
pub use token_bucket::Bucket;
pub use token_bucket::TokenBucket;

/// Reasons why a request might be rejected by a strategy.
#[derive(Debug, PartialEq)]
pub enum Reason {
    Overloaded { retry_after: Duration },
}

/// The admission capability implemented by every rate-limiting algorithm.
///
/// Strategies must be `Send` and `Sync` to allow sharing across thread boundaries
/// via `Arc`. The trait is object safe, so the concrete algorithm can be picked
/// from configuration and handed around as `Arc<dyn Strategy + Send + Sync>`.
pub trait Strategy: Debug {
    /// Attempts to admit a single request for `key`.
    ///
    /// This method never blocks beyond acquiring the key's own record lock.
    ///
    /// # Errors
    ///
    /// Returns `Reason` if the key's quota has been reached.
    fn process(&self, key: &str) -> ControlFlow<Reason>;

    /// Returns `true` if the request for `key` is admitted.
    fn admit(&self, key: &str) -> bool {
        self.process(key).is_continue()
    }
}

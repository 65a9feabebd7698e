use std::ops::ControlFlow;
use std::time::Duration;

use quanta::Clock;
use quanta::Instant;

use super::ConfigError;
use super::Reason;
use super::Strategy;
use crate::store::KeyStore;
use crate::store::ShardedStore;

/// One key's token balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    tokens: usize,
    last_refill: Instant,
}

impl Bucket {
    pub fn tokens(&self) -> usize {
        self.tokens
    }

    /// When whole tokens were last credited.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    fn refill(&mut self, now: Instant, capacity: usize, refill_rate: f64) {
        let added = accrued(now.saturating_duration_since(self.last_refill), refill_rate);

        // The refill clock only moves when whole tokens land, so partial
        // accrual carries over to the next request.
        if added > 0 {
            self.tokens = self.tokens.saturating_add(added).min(capacity);
            self.last_refill = now;
        }
    }
}

/// Whole tokens earned over `elapsed`.
fn accrued(elapsed: Duration, refill_rate: f64) -> usize {
    // Float to int `as` casts saturate
    (elapsed.as_secs_f64() * refill_rate).floor() as usize
}

/// A per-key token bucket.
///
/// Every key starts with a full bucket of `capacity` tokens. Each admitted
/// request spends one token and tokens flow back in at `refill_rate` per second,
/// never beyond `capacity`.
#[derive(Debug)]
pub struct TokenBucket<S = ShardedStore<Bucket>> {
    capacity: usize,
    refill_rate: f64,
    /// Time it takes for one token to accrue.
    token_interval: Duration,
    clock: Clock,
    store: S,
}

impl TokenBucket {
    /// Creates a new `TokenBucket` strategy.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The most tokens a key's bucket can hold.
    /// * `refill_rate` - Tokens credited to each bucket per second.
    ///
    /// # Errors
    ///
    /// Fails if `capacity` is zero or `refill_rate` is not a finite positive number.
    pub fn new(capacity: usize, refill_rate: f64) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, refill_rate, Clock::new())
    }

    pub fn with_clock(capacity: usize, refill_rate: f64, clock: Clock) -> Result<Self, ConfigError> {
        Self::with_store(capacity, refill_rate, clock, ShardedStore::new())
    }
}

impl<S> TokenBucket<S>
where
    S: KeyStore<Bucket>,
{
    /// Creates a `TokenBucket` backed by a caller-supplied store.
    pub fn with_store(
        capacity: usize,
        refill_rate: f64,
        clock: Clock,
        store: S,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !refill_rate.is_finite() || refill_rate <= 0.0 {
            return Err(ConfigError::InvalidRefillRate(refill_rate));
        }

        Ok(Self {
            capacity,
            refill_rate,
            token_interval: Duration::try_from_secs_f64(refill_rate.recip())
                .unwrap_or(Duration::MAX),
            clock,
            store,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// Returns a copy of `key`'s bucket as of its last request, if the key has been seen.
    pub fn peek(&self, key: &str) -> Option<Bucket> {
        self.store.get(key).map(|slot| slot.read(|b| *b))
    }

    /// Drops every bucket that would be full by now.
    ///
    /// A full bucket is indistinguishable from the one a new key receives, so a
    /// purge never changes an admission decision.
    pub fn purge_idle(&self) -> usize {
        let now = self.clock.now();
        self.store.evict(|b| {
            let added = accrued(now.saturating_duration_since(b.last_refill), self.refill_rate);
            b.tokens.saturating_add(added) >= self.capacity
        })
    }
}

impl<S> Strategy for TokenBucket<S>
where
    S: KeyStore<Bucket>,
{
    fn process(&self, key: &str) -> ControlFlow<Reason> {
        let now = self.clock.now();
        let fresh = || Bucket {
            tokens: self.capacity,
            last_refill: now,
        };

        self.store.with_record(key, fresh, |b| {
            b.refill(now, self.capacity, self.refill_rate);

            if b.tokens > 0 {
                b.tokens -= 1;
                ControlFlow::Continue(())
            } else {
                let since = now.saturating_duration_since(b.last_refill);
                // `token_interval` is rounded to whole nanoseconds, so it can land
                // on or just before the instant the next token actually accrues
                ControlFlow::Break(Reason::Overloaded {
                    retry_after: self
                        .token_interval
                        .saturating_sub(since)
                        .max(Duration::from_nanos(1)),
                })
            }
        })
    }
}

use std::ops::ControlFlow;
use std::time::Duration;

use quanta::Clock;
use quanta::Instant;

use super::ConfigError;
use super::Reason;
use super::Strategy;
use crate::store::KeyStore;
use crate::store::ShardedStore;

/// One key's counting slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    start: Instant,
    count: usize,
}

impl Window {
    /// When the current slice began.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Requests admitted since [`Window::start`].
    pub fn count(&self) -> usize {
        self.count
    }
}

/// A per-key window-based limiter.
///
/// Each key's window opens on its first request and lasts `window`. The first
/// request to observe an elapsed window starts a fresh one. It is the cheapest
/// strategy but is susceptible to "boundary bursts" where double the limit is
/// admitted in a short period spanning two windows.
#[derive(Debug)]
pub struct FixedWindow<S = ShardedStore<Window>> {
    max_requests: usize,
    window: Duration,
    clock: Clock,
    store: S,
}

impl FixedWindow {
    /// Creates a new `FixedWindow` strategy.
    ///
    /// # Arguments
    ///
    /// * `max_requests` - The maximum number of requests a key may make within one window.
    /// * `window` - The duration of the fixed time window.
    ///
    /// # Errors
    ///
    /// Fails if either argument is zero.
    pub fn new(max_requests: usize, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(max_requests, window, Clock::new())
    }

    pub fn with_clock(
        max_requests: usize,
        window: Duration,
        clock: Clock,
    ) -> Result<Self, ConfigError> {
        Self::with_store(max_requests, window, clock, ShardedStore::new())
    }
}

impl<S> FixedWindow<S>
where
    S: KeyStore<Window>,
{
    /// Creates a `FixedWindow` backed by a caller-supplied store.
    pub fn with_store(
        max_requests: usize,
        window: Duration,
        clock: Clock,
        store: S,
    ) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }

        Ok(Self {
            max_requests,
            window,
            clock,
            store,
        })
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// Returns a copy of `key`'s window, if the key has been seen.
    pub fn peek(&self, key: &str) -> Option<Window> {
        self.store.get(key).map(|slot| slot.read(|w| *w))
    }

    /// Drops every key whose window has elapsed.
    ///
    /// The next request from such a key would have reset it anyway, so a purge
    /// never changes an admission decision.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.store
            .evict(|w| now.saturating_duration_since(w.start) >= self.window)
    }
}

impl<S> Strategy for FixedWindow<S>
where
    S: KeyStore<Window>,
{
    fn process(&self, key: &str) -> ControlFlow<Reason> {
        let now = self.clock.now();
        let fresh = || Window {
            start: now,
            count: 0,
        };

        self.store.with_record(key, fresh, |w| {
            let elapsed = now.saturating_duration_since(w.start);

            // A request landing exactly on the boundary opens a new window
            if elapsed >= self.window {
                w.start = now;
                w.count = 0;
            }

            if w.count < self.max_requests {
                w.count += 1;
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(Reason::Overloaded {
                    retry_after: self.window.saturating_sub(elapsed),
                })
            }
        })
    }
}

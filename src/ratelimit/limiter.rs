//! Core rate limiter implementation.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::time::Duration;
use tracing::{debug, trace};

/// Default window length in milliseconds.
pub const DEFAULT_WINDOW_MILLIS: u64 = 60_000;
/// Default number of distinct keys tracked at once.
pub const DEFAULT_MAX_TRACKED_KEYS: usize = 500;

/// Construction options for a [`RateLimiter`].
///
/// Missing or zero values fall back to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterOptions {
    /// Window length before an untouched counter expires
    pub window_millis: Option<u64>,
    /// Maximum number of distinct keys resident at once
    pub max_tracked_keys: Option<usize>,
}

impl LimiterOptions {
    /// Effective window length.
    pub fn window(&self) -> Duration {
        let millis = self
            .window_millis
            .filter(|&ms| ms > 0)
            .unwrap_or(DEFAULT_WINDOW_MILLIS);
        Duration::from_millis(millis)
    }

    /// Effective key capacity.
    pub fn max_tracked_keys(&self) -> usize {
        self.max_tracked_keys
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_TRACKED_KEYS)
    }
}

/// Outcome of a single [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the caller has reached its limit
    pub is_rate_limited: bool,
    /// `limit - usage`; negative once the caller is past its limit
    pub usage_left: i64,
}

impl RateLimitDecision {
    /// Remaining quota floored at zero, for display.
    pub fn remaining(&self) -> u64 {
        self.usage_left.max(0) as u64
    }
}

/// Process-local admission counter.
///
/// Counters live in a bounded LRU cache whose entries expire one window after
/// their last write. Each instance owns its own cache; the gate builds one per
/// protected route. Increments go through the cache's per-key upsert, so two
/// callers on the same key never read the same count.
pub struct RateLimiter {
    cache: Cache<String, u64>,
    window: Duration,
    max_tracked_keys: usize,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(options: LimiterOptions) -> Self {
        let window = options.window();
        let max_tracked_keys = options.max_tracked_keys();

        debug!(
            window_ms = window.as_millis() as u64,
            max_tracked_keys, "Creating rate limiter"
        );

        let cache = Cache::builder()
            .max_capacity(max_tracked_keys as u64)
            .time_to_live(window)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            cache,
            window,
            max_tracked_keys,
        }
    }

    /// Record one attempt for `key` and report whether it is over `limit`.
    ///
    /// The call counts itself: the `n`-th call in a window sees `usage == n`,
    /// is limited once `n >= limit`, and reports `usage_left == limit - n`.
    pub fn check(&self, key: &str, limit: u32) -> RateLimitDecision {
        let usage = self
            .cache
            .entry_by_ref(key)
            .and_upsert_with(|current| {
                current.map_or(1, |entry| entry.into_value().saturating_add(1))
            })
            .into_value();

        // A new key may push the cache over capacity; evict now rather than
        // on the cache's own schedule.
        if usage == 1 {
            self.cache.run_pending_tasks();
        }

        let limit = i64::from(limit);
        let usage = usage.min(i64::MAX as u64) as i64;
        let decision = RateLimitDecision {
            is_rate_limited: usage >= limit,
            usage_left: limit - usage,
        };

        trace!(key = %key, usage, limit, "Checked rate limit");
        if decision.is_rate_limited {
            debug!(key = %key, usage, limit, "Rate limit reached");
        }

        decision
    }

    /// Current count for `key`, or `None` if it is absent or expired.
    ///
    /// The lookup counts as a use of `key` for eviction order.
    pub fn counter_value(&self, key: &str) -> Option<u64> {
        self.cache.get(key)
    }

    /// Drop expired counters. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.cache.entry_count();
        self.cache.run_pending_tasks();
        before.saturating_sub(self.cache.entry_count()) as usize
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    /// Number of resident counters.
    pub fn counter_count(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_tracked_keys(&self) -> usize {
        self.max_tracked_keys
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterOptions::default())
    }
}

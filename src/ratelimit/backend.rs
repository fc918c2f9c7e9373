//! Counter store trait for abstracting where admission counters live.

use async_trait::async_trait;

use super::limiter::{RateLimitDecision, RateLimiter};
use crate::error::Result;

/// Trait for counter store implementations.
///
/// The gate only talks to this trait, so the in-memory [`RateLimiter`] can be
/// replaced by a store shared between instances without touching the handlers.
/// Unlike the in-memory limiter, such a store may fail; callers decide how to
/// treat the error.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one attempt for `key` and report whether it is over `limit`.
    async fn check(&self, key: &str, limit: u32) -> Result<RateLimitDecision>;
}

#[async_trait]
impl CounterStore for RateLimiter {
    async fn check(&self, key: &str, limit: u32) -> Result<RateLimitDecision> {
        Ok(RateLimiter::check(self, key, limit))
    }
}

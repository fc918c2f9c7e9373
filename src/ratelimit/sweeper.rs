//! Periodic purge of expired counters.
//!
//! Expired counters are only removed during cache maintenance, which otherwise
//! runs when a new key arrives. The sweeper runs it on a timer so idle keys are
//! freed early.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::limiter::RateLimiter;

/// Spawn a task that purges expired counters from every limiter each `period`.
///
/// Returns `None` when `period` is zero. Abort the handle to stop the task.
pub fn spawn_sweeper(limiters: Vec<Arc<RateLimiter>>, period: Duration) -> Option<JoinHandle<()>> {
    if period.is_zero() {
        return None;
    }

    info!(period_ms = period.as_millis() as u64, limiters = limiters.len(), "Starting counter sweeper");

    Some(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed: usize = limiters.iter().map(|l| l.purge_expired()).sum();
            if removed > 0 {
                debug!(removed, "Purged expired counters");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::LimiterOptions;

    #[test]
    fn test_zero_period_disables_sweeper() {
        let limiter = Arc::new(RateLimiter::default());
        assert!(spawn_sweeper(vec![limiter], Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn test_sweeper_purges_expired_counters() {
        let limiter = Arc::new(RateLimiter::new(LimiterOptions {
            window_millis: Some(20),
            max_tracked_keys: None,
        }));
        limiter.check("a", 5);
        limiter.check("b", 5);
        assert_eq!(limiter.counter_count(), 2);

        let handle = spawn_sweeper(vec![Arc::clone(&limiter)], Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(limiter.counter_count(), 0);
    }
}

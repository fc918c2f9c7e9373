//! Rate limiting logic and state management.

mod backend;
mod key;
mod limiter;
mod rules;
mod sweeper;

pub use backend::CounterStore;
pub use key::LimitKey;
pub use limiter::{
    LimiterOptions, RateLimitDecision, RateLimiter, DEFAULT_MAX_TRACKED_KEYS, DEFAULT_WINDOW_MILLIS,
};
pub use rules::{Route, RouteLimits};
pub use sweeper::spawn_sweeper;

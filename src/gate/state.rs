//! Shared state handed to every handler.

use std::sync::Arc;

use super::upstream::Upstream;
use crate::ratelimit::{CounterStore, LimiterOptions, RateLimiter, Route, RouteLimits};

/// One in-memory limiter per protected route.
///
/// Routes never share a cache, so each has its own capacity and expiry.
pub struct RouteLimiters {
    send_message: Arc<RateLimiter>,
    suggest_messages: Arc<RateLimiter>,
    sign_up: Arc<RateLimiter>,
    verify_code: Arc<RateLimiter>,
}

impl RouteLimiters {
    pub fn new(options: LimiterOptions) -> Self {
        Self {
            send_message: Arc::new(RateLimiter::new(options)),
            suggest_messages: Arc::new(RateLimiter::new(options)),
            sign_up: Arc::new(RateLimiter::new(options)),
            verify_code: Arc::new(RateLimiter::new(options)),
        }
    }

    pub fn get(&self, route: Route) -> &Arc<RateLimiter> {
        match route {
            Route::SendMessage => &self.send_message,
            Route::SuggestMessages => &self.suggest_messages,
            Route::SignUp => &self.sign_up,
            Route::VerifyCode => &self.verify_code,
        }
    }

    /// Every limiter, for the sweeper.
    pub fn all(&self) -> Vec<Arc<RateLimiter>> {
        Route::ALL.iter().map(|&r| Arc::clone(self.get(r))).collect()
    }
}

/// A route's counter store together with its limit.
#[derive(Clone)]
pub struct RouteGuard {
    pub store: Arc<dyn CounterStore>,
    pub limit: u32,
}

#[derive(Clone)]
struct RouteGuards {
    send_message: RouteGuard,
    suggest_messages: RouteGuard,
    sign_up: RouteGuard,
    verify_code: RouteGuard,
}

impl RouteGuards {
    fn get_mut(&mut self, route: Route) -> &mut RouteGuard {
        match route {
            Route::SendMessage => &mut self.send_message,
            Route::SuggestMessages => &mut self.suggest_messages,
            Route::SignUp => &mut self.sign_up,
            Route::VerifyCode => &mut self.verify_code,
        }
    }
}

/// Application state shared across routes.
#[derive(Clone)]
pub struct GateState {
    guards: Arc<RouteGuards>,
    upstream: Arc<dyn Upstream>,
}

impl GateState {
    /// Guard every route with its in-memory limiter.
    pub fn new(limiters: &RouteLimiters, limits: RouteLimits, upstream: Arc<dyn Upstream>) -> Self {
        let guard = |route: Route| RouteGuard {
            store: Arc::clone(limiters.get(route)) as Arc<dyn CounterStore>,
            limit: limits.limit_for(route),
        };

        Self {
            guards: Arc::new(RouteGuards {
                send_message: guard(Route::SendMessage),
                suggest_messages: guard(Route::SuggestMessages),
                sign_up: guard(Route::SignUp),
                verify_code: guard(Route::VerifyCode),
            }),
            upstream,
        }
    }

    /// Replace the counter store of one route, keeping its limit.
    pub fn with_store(mut self, route: Route, store: Arc<dyn CounterStore>) -> Self {
        Arc::make_mut(&mut self.guards).get_mut(route).store = store;
        self
    }

    pub fn guard(&self, route: Route) -> &RouteGuard {
        match route {
            Route::SendMessage => &self.guards.send_message,
            Route::SuggestMessages => &self.guards.suggest_messages,
            Route::SignUp => &self.guards.sign_up,
            Route::VerifyCode => &self.guards.verify_code,
        }
    }

    pub fn upstream(&self) -> &dyn Upstream {
        self.upstream.as_ref()
    }
}

//! Admission decisions and their rate-limit headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use tracing::{debug, warn};

use super::response::{ApiResponse, RATE_LIMITED_MESSAGE};
use crate::ratelimit::{CounterStore, LimitKey, RateLimitDecision};

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Outcome of consulting a route's counter store for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// The route's configured limit
    pub limit: u32,
    /// The store's decision, or `None` if the store could not be consulted
    pub decision: Option<RateLimitDecision>,
}

impl Admission {
    /// Whether the request must be rejected with 429.
    pub fn is_rate_limited(&self) -> bool {
        self.decision.is_some_and(|d| d.is_rate_limited)
    }

    /// Remaining quota floored at zero; `None` when the store failed.
    pub fn remaining(&self) -> Option<u64> {
        self.decision.map(|d| d.remaining())
    }

    /// Attach `X-RateLimit-Limit`, and `X-RateLimit-Remaining` when known.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        if let Some(remaining) = self.remaining() {
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
        }
    }

    /// The 429 reply for a limited request.
    pub fn rejection(&self) -> Response {
        let mut response =
            ApiResponse::failure(RATE_LIMITED_MESSAGE).with_status(StatusCode::TOO_MANY_REQUESTS);
        self.apply_headers(response.headers_mut());
        response
    }
}

/// Consult `store` for `key`.
///
/// A store error admits the request and only the limit is reported.
pub async fn admit(store: &dyn CounterStore, key: &LimitKey, limit: u32) -> Admission {
    let key = key.to_string_key();
    match store.check(&key, limit).await {
        Ok(decision) => {
            debug!(
                key = %key,
                limited = decision.is_rate_limited,
                usage_left = decision.usage_left,
                "Admission decided"
            );
            Admission {
                limit,
                decision: Some(decision),
            }
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Counter store failed, admitting request");
            Admission {
                limit,
                decision: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GateError, Result};
    use crate::ratelimit::{RateLimiter, Route};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn check(&self, _key: &str, _limit: u32) -> Result<RateLimitDecision> {
            Err(GateError::Store("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_admit_reports_decision() {
        let limiter = RateLimiter::default();
        let key = LimitKey::identity("carol", Route::VerifyCode);

        let first = admit(&limiter, &key, 2).await;
        assert!(!first.is_rate_limited());
        assert_eq!(first.remaining(), Some(1));

        let second = admit(&limiter, &key, 2).await;
        assert!(second.is_rate_limited());
        assert_eq!(second.remaining(), Some(0));
        assert_eq!(limiter.counter_value("carol_verify-code"), Some(2));
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let key = LimitKey::public("1.2.3.4", "alice", Route::SuggestMessages);
        let admission = admit(&BrokenStore, &key, 4).await;

        assert!(!admission.is_rate_limited());
        assert_eq!(admission.remaining(), None);

        let mut headers = HeaderMap::new();
        admission.apply_headers(&mut headers);
        assert_eq!(headers.get(LIMIT_HEADER).unwrap(), "4");
        assert!(headers.get(REMAINING_HEADER).is_none());
    }

    #[test]
    fn test_remaining_header_floored_at_zero() {
        let admission = Admission {
            limit: 5,
            decision: Some(RateLimitDecision {
                is_rate_limited: true,
                usage_left: -3,
            }),
        };

        let response = admission.rejection();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(LIMIT_HEADER).unwrap(), "5");
        assert_eq!(response.headers().get(REMAINING_HEADER).unwrap(), "0");
    }
}

//! Forwarding of admitted requests to the host application.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use std::time::Duration;
use tracing::{debug, error};

use super::client_addr::{FORWARDED_FOR, REAL_IP};
use crate::error::{GateError, Result};

/// An admitted request, ready to be replayed upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Path and query, e.g. `/api/send-message`
    pub path: String,
    /// Headers worth passing on (content type and caller address headers)
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamRequest {
    /// Keep only the headers the host application needs from the original request.
    pub fn new(path: impl Into<String>, original: &HeaderMap, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        for name in ["content-type", REAL_IP, FORWARDED_FOR] {
            if let Some(value) = original.get(name) {
                headers.insert(name, value.clone());
            }
        }
        Self {
            path: path.into(),
            headers,
            body,
        }
    }
}

/// The host application's reply.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Trait for whatever serves admitted requests.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamReply>;
}

/// Forwards admitted requests over HTTP with `POST`.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamReply> {
        let url = self.url(&request.path);
        debug!(url = %url, bytes = request.body.len(), "Forwarding admitted request");

        let mut builder = self.client.post(&url).body(request.body);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        let response = builder.send().await.map_err(|e| {
            error!(url = %url, error = %e, "Upstream request failed");
            GateError::Upstream(e)
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());
        let body = response.bytes().await?;

        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn test_request_keeps_only_forwarded_headers() {
        let mut original = HeaderMap::new();
        original.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        original.insert(REAL_IP, HeaderValue::from_static("10.0.0.1"));
        original.insert(header::COOKIE, HeaderValue::from_static("session=abc"));

        let request = UpstreamRequest::new("/api/sign-up", &original, Bytes::from_static(b"{}"));

        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.headers.get(REAL_IP).unwrap(), "10.0.0.1");
        assert!(request.headers.get(header::COOKIE).is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let upstream = HttpUpstream::new("http://app:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(upstream.url("/api/verify-code"), "http://app:3000/api/verify-code");
    }
}

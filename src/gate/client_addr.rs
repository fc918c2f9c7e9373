//! Caller address resolution from proxy headers.

use axum::http::HeaderMap;

/// Header set by the trusted reverse proxy.
pub const REAL_IP: &str = "x-real-ip";
/// Standard forwarding chain; the first entry is the original client.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Address used when neither header yields a value.
pub const UNKNOWN_ADDRESS: &str = "Unknown";

/// Resolve the caller's address for limiter keys.
///
/// `X-Real-IP` wins, then the first `X-Forwarded-For` entry, then
/// [`UNKNOWN_ADDRESS`]. Every caller without either header shares the
/// `Unknown` bucket, so a missing header never disables limiting.
pub fn client_address(headers: &HeaderMap) -> String {
    header_value(headers, REAL_IP)
        .or_else(|| {
            header_value(headers, FORWARDED_FOR)
                .and_then(|chain| chain.split(',').next().map(str::trim).map(str::to_string))
                .filter(|first| !first.is_empty())
        })
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

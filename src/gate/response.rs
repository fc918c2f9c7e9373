//! JSON envelope shared with the host application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded, please try again later";
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";
pub const UPSTREAM_UNAVAILABLE_MESSAGE: &str = "Upstream unavailable";

/// `{ "success": bool, "message": string, "data"?: object }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Pair the envelope with a status code.
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_omits_data() {
        let body = serde_json::to_value(ApiResponse::failure(RATE_LIMITED_MESSAGE)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "message": "Rate limit exceeded, please try again later"
            })
        );
    }
}

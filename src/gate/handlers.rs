//! Route handlers.
//!
//! Each handler extracts just enough of the request to build a limiter key,
//! consults the route's counter store and either rejects with 429 or forwards
//! the untouched request upstream.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::admission::{admit, Admission, LIMIT_HEADER};
use super::client_addr::client_address;
use super::response::{ApiResponse, INVALID_BODY_MESSAGE, UPSTREAM_UNAVAILABLE_MESSAGE};
use super::state::GateState;
use super::upstream::{UpstreamReply, UpstreamRequest};
use crate::ratelimit::{LimitKey, Route};

#[derive(Deserialize)]
struct SendMessageBody {
    username: String,
}

#[derive(Deserialize)]
struct SignUpBody {
    email: String,
}

#[derive(Deserialize)]
struct VerifyCodeBody {
    username: String,
}

/// `POST /api/send-message`, keyed by caller address and recipient.
#[instrument(skip_all, fields(route = %Route::SendMessage))]
pub async fn send_message(
    State(state): State<GateState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(parsed) = parse_body::<SendMessageBody>(&body, |b| &b.username) else {
        return invalid_body();
    };
    let key = LimitKey::public(&client_address(&headers), &parsed.username, Route::SendMessage);
    guarded(&state, key, &uri, &headers, body).await
}

/// `POST /api/suggest-messages/{username}`, keyed by caller address and recipient.
#[instrument(skip_all, fields(route = %Route::SuggestMessages))]
pub async fn suggest_messages(
    State(state): State<GateState>,
    Path(username): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if username.trim().is_empty() {
        return invalid_body();
    }
    let key = LimitKey::public(&client_address(&headers), &username, Route::SuggestMessages);
    guarded(&state, key, &uri, &headers, body).await
}

/// `POST /api/sign-up`, keyed by email.
#[instrument(skip_all, fields(route = %Route::SignUp))]
pub async fn sign_up(
    State(state): State<GateState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(parsed) = parse_body::<SignUpBody>(&body, |b| &b.email) else {
        return invalid_body();
    };
    let key = LimitKey::identity(&parsed.email, Route::SignUp);
    guarded(&state, key, &uri, &headers, body).await
}

/// `POST /api/verify-code`, keyed by the URI-decoded username.
#[instrument(skip_all, fields(route = %Route::VerifyCode))]
pub async fn verify_code(
    State(state): State<GateState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(parsed) = parse_body::<VerifyCodeBody>(&body, |b| &b.username) else {
        return invalid_body();
    };
    let username = urlencoding::decode(&parsed.username)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| parsed.username.clone());
    let key = LimitKey::identity(&username, Route::VerifyCode);
    guarded(&state, key, &uri, &headers, body).await
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Admit or reject, then forward.
async fn guarded(
    state: &GateState,
    key: LimitKey,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let route = key.route;
    let guard = state.guard(route);
    let admission = admit(guard.store.as_ref(), &key, guard.limit).await;

    if admission.is_rate_limited() {
        info!(key = %key, limit = guard.limit, "Rejected rate-limited request");
        return admission.rejection();
    }

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    match state
        .upstream()
        .forward(UpstreamRequest::new(path, headers, body))
        .await
    {
        Ok(reply) => relay(reply, &admission),
        Err(e) => {
            warn!(key = %key, error = %e, "Admitted request could not be forwarded");
            let mut response =
                ApiResponse::failure(UPSTREAM_UNAVAILABLE_MESSAGE).with_status(StatusCode::BAD_GATEWAY);
            response
                .headers_mut()
                .insert(LIMIT_HEADER, HeaderValue::from(admission.limit));
            response
        }
    }
}

fn relay(reply: UpstreamReply, admission: &Admission) -> Response {
    let mut response = Response::new(Body::from(reply.body));
    *response.status_mut() = reply.status;
    if let Some(content_type) = reply.content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    admission.apply_headers(response.headers_mut());
    response
}

/// Parse `body` and require the key field selected by `field` to be non-blank.
fn parse_body<T>(body: &[u8], field: impl Fn(&T) -> &String) -> Option<T>
where
    T: DeserializeOwned,
{
    serde_json::from_slice::<T>(body)
        .ok()
        .filter(|parsed| !field(parsed).trim().is_empty())
}

fn invalid_body() -> Response {
    ApiResponse::failure(INVALID_BODY_MESSAGE).with_status(StatusCode::BAD_REQUEST)
}

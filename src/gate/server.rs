//! HTTP server for the admission gate.

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span};

use super::handlers;
use super::state::GateState;
use crate::error::{GateError, Result};

/// Build the gate's router.
pub fn router(state: GateState) -> Router {
    Router::new()
        .route("/api/send-message", post(handlers::send_message))
        .route("/api/suggest-messages/:username", post(handlers::suggest_messages))
        .route("/api/sign-up", post(handlers::sign_up))
        .route("/api/verify-code", post(handlers::verify_code))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            info_span!(
                "request",
                id = %uuid::Uuid::new_v4(),
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
        .with_state(state)
}

/// HTTP server for the admission gate.
pub struct GateServer {
    /// Address to bind to
    addr: SocketAddr,
    state: GateState,
}

impl GateServer {
    pub fn new(addr: SocketAddr, state: GateState) -> Self {
        Self { addr, state }
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Admission gate listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                GateError::Io(e)
            })
    }
}

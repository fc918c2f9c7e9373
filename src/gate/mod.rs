//! HTTP admission gate in front of the host application's protected routes.

mod admission;
mod client_addr;
mod handlers;
mod response;
mod server;
mod state;
mod upstream;

pub use admission::{admit, Admission, LIMIT_HEADER, REMAINING_HEADER};
pub use client_addr::{client_address, UNKNOWN_ADDRESS};
pub use response::ApiResponse;
pub use server::{router, GateServer};
pub use state::{GateState, RouteGuard, RouteLimiters};
pub use upstream::{HttpUpstream, Upstream, UpstreamReply, UpstreamRequest};

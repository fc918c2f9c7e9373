//! anonq-gate - Admission control for an anonymous Q&A service
//!
//! This crate implements the rate-limiting layer that protects the public,
//! unauthenticated routes of the host application. Each protected route owns a
//! bounded, time-windowed counter cache; the HTTP gate builds a limiter key per
//! request, rejects callers over their quota with 429 and forwards everything
//! else to the host application.

pub mod config;
pub mod error;
pub mod gate;
pub mod ratelimit;

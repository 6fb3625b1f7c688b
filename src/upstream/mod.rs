//! Outbound (CDN) requests.
//!
//! # Transport Options
//! - Redirects are followed, bounded by `upstream.max_redirects`
//! - No cookie store; media requests also drop Cookie/Authorization
//! - Connect timeout on the client, header timeout per request; body
//!   streaming is not time-limited so long segments are not cut off

pub mod client;

pub use client::{build_client, send, OutboundRequest, UpstreamError};

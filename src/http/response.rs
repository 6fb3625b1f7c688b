//! Response construction.
//!
//! # Responsibilities
//! - Stream upstream responses back to the player
//! - Rebuild responses from buffered bodies
//! - Synthesize the fixed-shape JSON error responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire segments
//! - Hop-by-hop headers stripped in both directions
//! - Error bodies are always `{"error": .., "url": ..}` JSON

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper::ext::ReasonPhrase;
use serde::Serialize;

use crate::headers::rewrite::response_headers;

/// Message returned when a rewritten media request could not be fetched.
pub const FETCH_FAILED_MESSAGE: &str =
    "Network or CORS issue preventing fetch. Custom headers failed.";

/// Reason phrase of the synthesized 503.
pub const FETCH_FAILED_REASON: &[u8] = b"Media Relay Fetch Failed (CORS/Referer Issue)";

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
}

/// JSON error response with an optional custom reason phrase.
pub fn error_response(
    status: StatusCode,
    reason: Option<&'static [u8]>,
    message: &str,
    url: Option<&str>,
) -> Response {
    let body = serde_json::to_vec(&ErrorBody { error: message, url }).unwrap_or_default();
    let mut response = (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response();
    if let Some(reason) = reason {
        response
            .extensions_mut()
            .insert(ReasonPhrase::from_static(reason));
    }
    response
}

/// 503 answered when a media fetch fails and nothing else can serve it.
pub fn fetch_failed_response(url: &str) -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        Some(FETCH_FAILED_REASON),
        FETCH_FAILED_MESSAGE,
        Some(url),
    )
}

/// 502 answered when a plain forward fails.
pub fn bad_gateway_response(url: &str) -> Response {
    error_response(
        StatusCode::BAD_GATEWAY,
        None,
        "Upstream request failed",
        Some(url),
    )
}

/// Stream an upstream response to the player.
pub fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = response_headers(upstream.headers());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Build a response from an already buffered body.
pub fn buffered_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

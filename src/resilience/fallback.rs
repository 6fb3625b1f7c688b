//! Recovery after a failed media fetch.
//!
//! # Order
//! 1. A cached copy of the same request, when the cache is enabled
//! 2. The configured [`FailurePolicy`]:
//!    - `ServiceUnavailable`: synthesized 503 JSON
//!    - `RetryWithoutHeaders`: one re-issue of the original request,
//!      502 JSON if that fails too
//!
//! There is no backoff and no second retry.

use std::time::Instant;

use axum::response::Response;

use crate::config::schema::FailurePolicy;
use crate::http::response::{bad_gateway_response, fetch_failed_response, relay_response};
use crate::http::server::{AppState, RelayState};
use crate::observability::metrics;
use crate::upstream::{self, OutboundRequest, UpstreamError};

pub fn policy_label(policy: FailurePolicy) -> &'static str {
    match policy {
        FailurePolicy::ServiceUnavailable => "service_unavailable",
        FailurePolicy::RetryWithoutHeaders => "retry_without_headers",
    }
}

/// Produce the response for a media request whose rewritten fetch failed.
///
/// `original` is the request as received (hop-by-hop headers removed), without
/// the header bundle.
pub async fn recover(
    app: &AppState,
    relay: &RelayState,
    original: &OutboundRequest,
    error: UpstreamError,
    request_id: &str,
    start: Instant,
) -> Response {
    let url = original.url.as_str();
    let method = original.method.as_str();
    let policy = relay.config.upstream.failure_policy;

    tracing::error!(
        request_id = %request_id,
        url = %url,
        error = %error,
        "Media fetch failed (CORS, missing Referer, or network/TLS error)"
    );
    app.stats.record_upstream_failure();
    metrics::record_upstream_failure(policy_label(policy));

    if let Some(cache) = &relay.cache {
        if let Some(hit) = cache.get(&original.method, url) {
            tracing::info!(request_id = %request_id, url = %url, cache = %cache.name(), "Serving cached copy");
            app.stats.record_cache_hit();
            metrics::record_cache_hit();
            metrics::record_request(method, hit.status.as_u16(), "cache", start);
            return hit.into_response();
        }
    }

    match policy {
        FailurePolicy::ServiceUnavailable => {
            metrics::record_request(method, 503, "media", start);
            fetch_failed_response(url)
        }
        FailurePolicy::RetryWithoutHeaders => {
            app.stats.record_fallback_retry();
            tracing::warn!(request_id = %request_id, url = %url, "Retrying without custom headers");

            match upstream::send(&relay.client, original, relay.request_timeout()).await {
                Ok(response) => {
                    tracing::info!(
                        request_id = %request_id,
                        status = %response.status(),
                        "Fallback fetch succeeded"
                    );
                    metrics::record_request(method, response.status().as_u16(), "media", start);
                    relay_response(response)
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, url = %url, error = %e, "Fallback fetch failed");
                    metrics::record_request(method, 502, "media", start);
                    bad_gateway_response(url)
                }
            }
        }
    }
}

//! Header merging and sanitation for relayed requests and responses.

use axum::http::header::{AUTHORIZATION, CONNECTION, CONTENT_LENGTH, COOKIE, HOST};
use axum::http::{HeaderMap, HeaderName};

use crate::config::schema::MergeMode;
use crate::headers::selector::HeaderBundle;
use crate::http::request::X_REQUEST_ID;

/// Connection-scoped headers that never cross the relay.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Combine a request's headers with a bundle.
pub fn merge(original: &HeaderMap, bundle: &HeaderBundle, mode: MergeMode) -> HeaderMap {
    let mut merged = original.clone();
    for (name, value) in bundle.iter() {
        match mode {
            MergeMode::Override => {
                merged.insert(name.clone(), value.clone());
            }
            MergeMode::Preserve => {
                if !merged.contains_key(name) {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
    }
    merged
}

/// Remove headers that belong to the client-to-relay hop.
///
/// Applied before any request leaves the relay, ahead of the bundle merge, so
/// the bundle's own `Connection` value survives.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by the Connection header are hop-by-hop as well.
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    headers.remove(X_REQUEST_ID);
}

/// Drop credentials from a media request.
pub fn omit_credentials(headers: &mut HeaderMap) {
    headers.remove(COOKIE);
    headers.remove(AUTHORIZATION);
}

/// Copy upstream response headers that are safe to hand to the player.
pub fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream.iter() {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

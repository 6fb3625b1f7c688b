//! Target URL resolution.
//!
//! The relay accepts two request shapes:
//! - absolute-form (`GET http://cdn.example/seg.ts HTTP/1.1`), the relay is
//!   configured as the player's HTTP proxy
//! - `GET /relay?url=<percent-encoded URL>`, the player rewrites its URLs

use axum::http::Uri;
use thiserror::Error;
use url::Url;

/// Path of the query-parameter entry point.
pub const RELAY_PATH: &str = "/relay";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("request does not name a target URL; use an absolute URI or /relay?url=")]
    Missing,

    #[error("target URL is malformed: {0}")]
    Malformed(String),

    #[error("unsupported target scheme '{0}'")]
    UnsupportedScheme(String),
}

/// Work out which URL the player actually asked for.
pub fn resolve_target(uri: &Uri) -> Result<Url, TargetError> {
    let raw = if uri.scheme().is_some() {
        uri.to_string()
    } else if uri.path() == RELAY_PATH {
        let query = uri.query().ok_or(TargetError::Missing)?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned())
            .ok_or(TargetError::Missing)?
    } else {
        return Err(TargetError::Missing);
    };

    let url = Url::parse(&raw).map_err(|e| TargetError::Malformed(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TargetError::UnsupportedScheme(other.to_string())),
    }
}

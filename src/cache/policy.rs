//! Which responses may be mirrored into the cache.

use axum::http::{Method, StatusCode};

use crate::config::schema::CacheConfig;

#[derive(Debug, Clone)]
pub struct CachePolicy {
    excluded_markers: Vec<String>,
    max_entry_bytes: u64,
}

impl CachePolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            excluded_markers: config
                .excluded_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            max_entry_bytes: config.max_entry_bytes,
        }
    }

    /// Live manifests and segments change or expire quickly and are never kept.
    pub fn is_excluded(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.excluded_markers.iter().any(|m| url.contains(m.as_str()))
    }

    /// A response is cacheable when it answers a GET with 2xx, its URL is not
    /// excluded and its declared length fits the per-entry limit.
    pub fn is_cacheable(
        &self,
        method: &Method,
        url: &str,
        status: StatusCode,
        content_length: Option<u64>,
    ) -> bool {
        if method != Method::GET || !status.is_success() || self.is_excluded(url) {
            return false;
        }
        matches!(content_length, Some(len) if len <= self.max_entry_bytes)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

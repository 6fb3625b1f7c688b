//! In-memory response cache.
//!
//! Entries are keyed by request identity (`"{METHOD} {url}"`). There is no
//! eviction; concurrent stores for the same key resolve as last write wins.
//! Byte accounting is updated while the entry's shard is locked, so it never
//! disagrees with the entries once writers settle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::observability::metrics;

/// Response header marking a reply served from the cache.
pub const X_RELAY_CACHE: &str = "x-relay-cache";

/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub stored_at: SystemTime,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: SystemTime::now(),
        }
    }

    /// Turn the entry into a response for the player.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(X_RELAY_CACHE, HeaderValue::from_static("hit"));
        response
    }
}

/// A named, shareable response cache.
#[derive(Debug)]
pub struct ResponseCache {
    name: String,
    entries: DashMap<String, CachedResponse>,
    bytes: AtomicU64,
}

impl ResponseCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            bytes: AtomicU64::new(0),
        }
    }

    pub fn key(method: &Method, url: &str) -> String {
        format!("{} {}", method, url)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, method: &Method, url: &str) -> Option<CachedResponse> {
        self.entries
            .get(&Self::key(method, url))
            .map(|r| r.value().clone())
    }

    /// Store an entry, replacing any previous one for the same request.
    pub fn store(&self, method: &Method, url: &str, response: CachedResponse) {
        let added = response.body.len() as u64;
        match self.entries.entry(Self::key(method, url)) {
            Entry::Occupied(mut slot) => {
                let old = slot.insert(response);
                self.bytes.fetch_sub(old.body.len() as u64, Ordering::Relaxed);
                self.bytes.fetch_add(added, Ordering::Relaxed);
            }
            Entry::Vacant(slot) => {
                let _held = slot.insert(response);
                self.bytes.fetch_add(added, Ordering::Relaxed);
            }
        }
        metrics::record_cache_size(self.entries.len());
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            self.bytes.fetch_sub(entry.body.len() as u64, Ordering::Relaxed);
            removed += 1;
            false
        });
        metrics::record_cache_size(self.entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of cached body sizes.
    pub fn total_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(body: &'static str) -> CachedResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("video/mp4"));
        CachedResponse::new(StatusCode::OK, headers, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn test_cache_operations() {
        let cache = ResponseCache::new("media-relay-v1");
        let url = "https://cdn.example.com/clip.mp4";

        assert!(cache.get(&Method::GET, url).is_none());

        cache.store(&Method::GET, url, entry("first"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 5);
        assert_eq!(cache.get(&Method::GET, url).unwrap().body, "first");

        // keyed by method as well as URL
        assert!(cache.get(&Method::HEAD, url).is_none());
    }

    #[test]
    fn last_write_wins() {
        let cache = ResponseCache::new("v1");
        let url = "https://cdn.example.com/clip.mp4";
        cache.store(&Method::GET, url, entry("first"));
        cache.store(&Method::GET, url, entry("second!"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 7);
        assert_eq!(cache.get(&Method::GET, url).unwrap().body, "second!");
    }

    #[test]
    fn clear_reports_removed_entries() {
        let cache = ResponseCache::new("v1");
        cache.store(&Method::GET, "https://a.com/1.mp4", entry("a"));
        cache.store(&Method::GET, "https://a.com/2.mp4", entry("b"));

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn bytes_track_entries_under_concurrent_clear() {
        let cache = std::sync::Arc::new(ResponseCache::new("v1"));
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let url = format!("https://a.com/{}/{}.mp4", w, i % 20);
                        cache.store(&Method::GET, &url, entry("segment"));
                    }
                })
            })
            .collect();
        let clearer = {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    cache.clear();
                }
            })
        };
        for handle in writers {
            handle.join().unwrap();
        }
        clearer.join().unwrap();

        let counted: u64 = cache.entries.iter().map(|e| e.body.len() as u64).sum();
        assert_eq!(cache.total_bytes(), counted);

        cache.clear();
        assert_eq!(cache.total_bytes(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_response_is_marked() {
        let response = entry("body").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(X_RELAY_CACHE).unwrap(), "hit");
        assert_eq!(response.headers().get("content-type").unwrap(), "video/mp4");
    }
}

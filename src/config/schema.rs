//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the media relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Header bundles and domain groups.
    pub rewrite: RewriteConfig,

    /// Media request detection.
    pub intercept: InterceptConfig,

    /// Outbound client settings and failure handling.
    pub upstream: UpstreamConfig,

    /// Optional response cache.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Maximum requests handled concurrently (backpressure).
    pub max_connections: usize,

    /// Answer browser preflights and add permissive CORS headers.
    pub cors_enabled: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_connections: 10_000,
            cors_enabled: true,
        }
    }
}

/// How the selected header bundle is combined with the request's own headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Bundle values replace headers of the same name.
    #[default]
    Override,
    /// Bundle values are only added where the request has no such header.
    Preserve,
}

/// Header rewrite configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Hostnames (matched as URL substrings) that require the restricted bundle.
    pub restricted_hosts: Vec<String>,

    /// Referer sent to restricted hosts.
    pub restricted_referer: String,

    /// Origin sent to restricted hosts.
    pub restricted_origin: String,

    /// Referer sent everywhere else.
    pub default_referer: String,

    /// Origin sent everywhere else.
    pub default_origin: String,

    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,

    /// `identity` keeps segment bytes uncompressed end to end.
    pub accept_encoding: String,

    pub merge_mode: MergeMode,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            restricted_hosts: vec![
                "xlz.livecdnem.com".to_string(),
                "fast5cdn.net".to_string(),
                "procdnlive.com".to_string(),
            ],
            restricted_referer: "https://xlz.livecdnem.com/".to_string(),
            restricted_origin: "https://xlz.livecdnem.com".to_string(),
            default_referer: "https://peepoople.com/".to_string(),
            default_origin: "https://peepoople.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept: "*/*".to_string(),
            accept_language: "en-US,en;q=0.9,vi;q=0.8".to_string(),
            accept_encoding: "identity".to_string(),
            merge_mode: MergeMode::Override,
        }
    }
}

/// Media request detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// URL substrings (extensions or hostnames) marking a request as media.
    pub media_markers: Vec<String>,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            media_markers: [
                ".m3u8",
                ".ts",
                ".mp4",
                ".webm",
                ".mpd",
                "xlz.livecdnem.com",
                "fast5cdn.net",
                "procdnlive.com",
                "peepoople.com",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        }
    }
}

/// What happens when a rewritten media request cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Answer with a synthesized 503 JSON error.
    #[default]
    ServiceUnavailable,
    /// Re-issue the request once with its original headers.
    RetryWithoutHeaders,
}

/// Upstream (CDN) client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Maximum redirects followed per request.
    pub max_redirects: usize,

    /// Honor HTTP(S)_PROXY environment variables for outbound requests.
    pub system_proxy: bool,

    pub failure_policy: FailurePolicy,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            system_proxy: true,
            failure_policy: FailurePolicy::ServiceUnavailable,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable mirroring of successful responses.
    pub enabled: bool,

    /// Cache generation name. Changing it on reload drops the old cache.
    pub name: String,

    /// URL substrings that are never cached (live manifests and segments).
    pub excluded_markers: Vec<String>,

    /// Largest response body (by Content-Length) that will be cached.
    pub max_entry_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: "media-relay-v1".to_string(),
            excluded_markers: vec![".m3u8".to_string(), ".ts".to_string()],
            max_entry_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Wait for an upstream response head, in seconds. A whole relayed
    /// request is bounded by three times this.
    pub request_secs: u64,

    /// Idle pooled upstream connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

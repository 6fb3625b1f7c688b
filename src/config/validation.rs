//! Configuration validation.
//!
//! Serde handles syntax; this pass checks value ranges, addresses and that
//! every configured header value can actually be sent. All errors are
//! collected so a bad file is reported in one go.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `rewrite.user_agent`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    let rewrite = &config.rewrite;
    for (i, host) in rewrite.restricted_hosts.iter().enumerate() {
        if host.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("rewrite.restricted_hosts[{}]", i),
                "must not be empty",
            ));
        }
    }
    let header_fields = [
        ("rewrite.restricted_referer", &rewrite.restricted_referer),
        ("rewrite.restricted_origin", &rewrite.restricted_origin),
        ("rewrite.default_referer", &rewrite.default_referer),
        ("rewrite.default_origin", &rewrite.default_origin),
        ("rewrite.user_agent", &rewrite.user_agent),
        ("rewrite.accept", &rewrite.accept),
        ("rewrite.accept_language", &rewrite.accept_language),
        ("rewrite.accept_encoding", &rewrite.accept_encoding),
    ];
    for (field, value) in header_fields {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(field, "not a valid HTTP header value"));
        }
    }

    if config.intercept.media_markers.is_empty() {
        errors.push(ValidationError::new(
            "intercept.media_markers",
            "at least one marker is required",
        ));
    }
    for (i, marker) in config.intercept.media_markers.iter().enumerate() {
        if marker.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("intercept.media_markers[{}]", i),
                "must not be empty",
            ));
        }
    }

    if config.cache.enabled && config.cache.name.trim().is_empty() {
        errors.push(ValidationError::new("cache.name", "must not be empty when the cache is enabled"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty when admin is enabled"));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a socket address", value)));
    }
}

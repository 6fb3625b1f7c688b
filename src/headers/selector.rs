//! Header bundle selection by domain group.
//!
//! # Responsibilities
//! - Decide which CDN group a URL belongs to
//! - Hand out the complete header bundle for that group
//!
//! # Design Decisions
//! - Matching is a case-insensitive substring test on the whole URL, not a
//!   parsed-host comparison, so `https://a.com/?src=fast5cdn.net` is restricted
//! - Header values are parsed once when the selector is built; selection
//!   itself cannot fail

use axum::http::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, ORIGIN, PRAGMA, REFERER,
    USER_AGENT,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::RewriteConfig;

/// Which header bundle a URL receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainGroup {
    /// CDNs that only serve requests carrying their own Referer/Origin.
    RestrictedCdn,
    /// Everything else.
    DefaultCdn,
}

impl DomainGroup {
    /// Classify a URL against a list of lower-cased restricted hosts.
    pub fn classify(url: &str, restricted_hosts: &[String]) -> Self {
        let url = url.to_lowercase();
        if restricted_hosts.iter().any(|h| url.contains(h.as_str())) {
            DomainGroup::RestrictedCdn
        } else {
            DomainGroup::DefaultCdn
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainGroup::RestrictedCdn => "restricted",
            DomainGroup::DefaultCdn => "default",
        }
    }
}

impl std::fmt::Display for DomainGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed header set applied to a media request.
#[derive(Debug, Clone)]
pub struct HeaderBundle {
    group: DomainGroup,
    headers: HeaderMap,
}

impl HeaderBundle {
    pub fn group(&self) -> DomainGroup {
        self.group
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn get(&self, name: HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn referer(&self) -> Option<&str> {
        self.headers.get(REFERER).and_then(|v| v.to_str().ok())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter()
    }
}

/// A configured header value could not be used.
#[derive(Debug, Error)]
#[error("invalid value for header {header}: {value:?}")]
pub struct SelectorError {
    pub header: HeaderName,
    pub value: String,
}

/// Picks the header bundle for a request URL.
#[derive(Debug, Clone)]
pub struct HeaderSelector {
    restricted_hosts: Vec<String>,
    restricted: HeaderBundle,
    default: HeaderBundle,
}

impl HeaderSelector {
    /// Build a selector from the rewrite configuration.
    pub fn from_config(config: &RewriteConfig) -> Result<Self, SelectorError> {
        let common = [
            (USER_AGENT, config.user_agent.as_str()),
            (ACCEPT, config.accept.as_str()),
            (ACCEPT_LANGUAGE, config.accept_language.as_str()),
            (ACCEPT_ENCODING, config.accept_encoding.as_str()),
            (CONNECTION, "keep-alive"),
            (CACHE_CONTROL, "no-cache"),
            (PRAGMA, "no-cache"),
        ];

        let build = |group, referer: &str, origin: &str| -> Result<HeaderBundle, SelectorError> {
            let mut headers = HeaderMap::with_capacity(common.len() + 2);
            for (name, value) in [(REFERER, referer), (ORIGIN, origin)]
                .into_iter()
                .chain(common.iter().cloned())
            {
                let parsed = HeaderValue::from_str(value).map_err(|_| SelectorError {
                    header: name.clone(),
                    value: value.to_string(),
                })?;
                headers.insert(name, parsed);
            }
            Ok(HeaderBundle { group, headers })
        };

        Ok(Self {
            restricted_hosts: config
                .restricted_hosts
                .iter()
                .map(|h| h.to_lowercase())
                .collect(),
            restricted: build(
                DomainGroup::RestrictedCdn,
                &config.restricted_referer,
                &config.restricted_origin,
            )?,
            default: build(
                DomainGroup::DefaultCdn,
                &config.default_referer,
                &config.default_origin,
            )?,
        })
    }

    /// Select the bundle for a URL. Always returns a complete bundle.
    pub fn select(&self, url: &str) -> &HeaderBundle {
        match DomainGroup::classify(url, &self.restricted_hosts) {
            DomainGroup::RestrictedCdn => &self.restricted,
            DomainGroup::DefaultCdn => &self.default,
        }
    }

    pub fn restricted_hosts(&self) -> &[String] {
        &self.restricted_hosts
    }
}

impl Default for HeaderSelector {
    fn default() -> Self {
        // The built-in values are all plain ASCII.
        Self::from_config(&RewriteConfig::default()).expect("default header values are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESTRICTED_REFERER: &str = "https://xlz.livecdnem.com/";
    const DEFAULT_REFERER: &str = "https://peepoople.com/";

    #[test]
    fn restricted_hosts_get_restricted_referer() {
        let selector = HeaderSelector::default();
        for url in [
            "https://xlz.livecdnem.com/live/stream.m3u8",
            "https://edge1.fast5cdn.net/seg-001.ts",
            "http://procdnlive.com/a/b/c.mp4?token=1",
            "https://XLZ.LiveCDNem.COM/Index.M3U8",
            "https://mirror.example.com/proxy?src=fast5cdn.net",
        ] {
            let bundle = selector.select(url);
            assert_eq!(bundle.group(), DomainGroup::RestrictedCdn, "{}", url);
            assert_eq!(bundle.referer(), Some(RESTRICTED_REFERER), "{}", url);
            assert_eq!(bundle.get(ORIGIN).unwrap(), "https://xlz.livecdnem.com");
        }
    }

    #[test]
    fn other_hosts_get_default_referer() {
        let selector = HeaderSelector::default();
        for url in [
            "https://peepoople.com/video.mp4",
            "https://cdn.example.org/live/index.m3u8",
            "http://127.0.0.1:8080/segment.ts",
            "",
        ] {
            let bundle = selector.select(url);
            assert_eq!(bundle.group(), DomainGroup::DefaultCdn, "{}", url);
            assert_eq!(bundle.referer(), Some(DEFAULT_REFERER), "{}", url);
            assert_eq!(bundle.get(ORIGIN).unwrap(), "https://peepoople.com");
        }
    }

    #[test]
    fn bundle_is_complete() {
        let selector = HeaderSelector::default();
        let bundle = selector.select("https://fast5cdn.net/x.ts");
        assert_eq!(bundle.len(), 9);
        assert_eq!(bundle.get(ACCEPT_ENCODING).unwrap(), "identity");
        assert_eq!(bundle.get(CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(bundle.get(PRAGMA).unwrap(), "no-cache");
        assert_eq!(bundle.get(CONNECTION).unwrap(), "keep-alive");
        assert_eq!(bundle.get(ACCEPT).unwrap(), "*/*");
        assert_eq!(bundle.get(ACCEPT_LANGUAGE).unwrap(), "en-US,en;q=0.9,vi;q=0.8");
        assert!(bundle
            .get(USER_AGENT)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Chrome/120.0.0.0"));
    }

    #[test]
    fn configured_hosts_are_case_folded() {
        let config = RewriteConfig {
            restricted_hosts: vec!["Media.Example.NET".into()],
            ..RewriteConfig::default()
        };
        let selector = HeaderSelector::from_config(&config).unwrap();
        assert_eq!(
            selector.select("https://media.example.net/a.mp4").group(),
            DomainGroup::RestrictedCdn
        );
        // built-in hosts are replaced, not extended
        assert_eq!(
            selector.select("https://fast5cdn.net/a.mp4").group(),
            DomainGroup::DefaultCdn
        );
    }

    #[test]
    fn invalid_value_fails_construction() {
        let config = RewriteConfig {
            default_origin: "https://bad\u{7f}origin".into(),
            ..RewriteConfig::default()
        };
        let err = HeaderSelector::from_config(&config).unwrap_err();
        assert_eq!(err.header, ORIGIN);
    }
}

//! Media relay library.
//!
//! A local HTTP relay that sits between a web video player and the media
//! CDNs it streams from, presenting each CDN with the Referer, Origin and
//! User-Agent it expects.

pub mod admin;
pub mod cache;
pub mod config;
pub mod headers;
pub mod http;
pub mod intercept;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

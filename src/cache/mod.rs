//! Optional response cache.
//!
//! # Data Flow
//! ```text
//! upstream success
//!     → policy.rs (GET, 2xx, not a manifest/segment, bounded length)
//!     → store.rs (mirror buffered response)
//!
//! upstream failure
//!     → store.rs lookup by request identity
//!     → hit: serve cached copy | miss: failure policy
//! ```
//!
//! # Design Decisions
//! - No eviction; the cache lives until cleared or replaced
//! - A cache generation is identified by name; a reload with a new name
//!   starts an empty cache and drops the old one

pub mod policy;
pub mod store;

pub use policy::CachePolicy;
pub use store::{CachedResponse, ResponseCache, X_RELAY_CACHE};

//! Header rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! media request URL
//!     → selector.rs (domain group → HeaderBundle)
//!     → rewrite.rs (strip hop-by-hop, merge bundle, omit credentials)
//!     → outbound request headers
//! ```

pub mod rewrite;
pub mod selector;

pub use rewrite::{merge, omit_credentials, response_headers, strip_hop_by_hop};
pub use selector::{DomainGroup, HeaderBundle, HeaderSelector, SelectorError};

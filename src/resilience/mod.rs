//! Failure handling for media fetches.
//!
//! # Data Flow
//! ```text
//! Rewritten fetch fails
//!     → fallback.rs: cached copy? → serve it
//!     → otherwise apply the configured failure policy
//! ```

pub mod fallback;

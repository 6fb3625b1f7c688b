//! Request interception subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → target.rs (absolute-form URI or /relay?url=…)
//!     → classify.rs (media marker lookup)
//!     → media: rewrite & forward | other: pass through untouched
//! ```
//!
//! # Design Decisions
//! - Only http and https targets are relayed
//! - Classification looks at the target URL alone, never at headers

pub mod classify;
pub mod target;

pub use classify::MediaClassifier;
pub use target::{resolve_target, TargetError};

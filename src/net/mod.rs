//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → Hand off to HTTP layer (axum::serve)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - A connection's slot is released when its stream is dropped

pub mod listener;

pub use listener::{BoundedListener, BoundedStream};

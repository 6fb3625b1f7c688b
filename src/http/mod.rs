//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, relay handler)
//!     → request.rs (request ID)
//!     → intercept (target resolution, media classification)
//!     → headers (bundle selection, merge)
//!     → upstream (fetch) / resilience (failure handling)
//!     → response.rs (stream back or synthesize error)
//!     → Send to player
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRelayRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, RelayState, ServerError};

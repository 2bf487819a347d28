//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, request id, access log, timeout)
//!     → handlers.rs (per-route entropy-seeded RNG)
//!     → routes::RouteHandler (simulate, record, export)
//!     → JSON response with the simulated status
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer, X_REQUEST_ID};

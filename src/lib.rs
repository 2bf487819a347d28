//! Instrumented demo service.
//!
//! Serves a handful of HTTP routes whose work is simulated: each request
//! builds a tree of timed, attributed operations, optionally injects a
//! failure, and reports the result as metrics, correlated log lines and
//! OTLP spans.

// Core
pub mod routes;
pub mod simulation;

// Surface
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::DemoConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Telemetry;

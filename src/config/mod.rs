//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional config file (TOML, loader.rs)
//!     → flag / environment overrides (overrides.rs)
//!     → validation.rs (semantic checks)
//!     → DemoConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Resource attributes never change control flow, only telemetry labels

pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use overrides::Overrides;
pub use schema::DemoConfig;
pub use schema::{BackgroundConfig, ListenerConfig, LogFormat, RouteProfile, ServiceConfig, TelemetryConfig};

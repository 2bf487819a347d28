//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Resolve config → Validate → Telemetry → Bind → Serve + background job
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Latched watch → server stops accepting and drains
//!               → background job exits at its next tick
//!     → span exporter flushed last
//! ```

pub mod background;
pub mod shutdown;
pub mod signals;

pub use background::BackgroundJob;
pub use shutdown::{Shutdown, ShutdownSignal};

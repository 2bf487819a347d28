//! Synthetic operation trees.
//!
//! # Data Flow
//! ```text
//! OperationTemplate (static, per route)
//!     → builder.rs (sample durations, sleep, resolve attributes, recurse)
//!     → OperationInstance tree (owned by the request)
//!     → errors.rs (attach scenario attributes, copy them up the ancestor chain)
//!     → handed to the route handler for payload, metrics, logs and export
//! ```
//!
//! # Design Decisions
//! - Children run sequentially inside their parent, so wall time is the sum
//!   of the subtree
//! - Timestamps are offsets from the trace origin, measured on the tokio clock
//! - All randomness flows through `RandomSource` so trees can be reproduced

pub mod builder;
pub mod errors;
pub mod instance;
pub mod random;
pub mod template;

pub use builder::BuildContext;
pub use errors::{ErrorInjector, ErrorKind, ErrorScenario};
pub use instance::{AttrValue, Attributes, Correlation, OperationInstance, SpanId, TraceId};
pub use random::RandomSource;
pub use template::{AttributeGenerator, Condition, DurationRange, LogLevel, LogLine, OperationTemplate};

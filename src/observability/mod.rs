//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Route handler / background job produce:
//!     → logging.rs (log lines correlated with an operation)
//!     → metrics.rs (request / error counters, duration histograms)
//!     → traces.rs (finished operation trees as OTLP spans)
//!
//! Consumers:
//!     → Log aggregation (stdout, plus OTLP logs when an endpoint is set)
//!     → Metrics endpoint (Prometheus scrape of /metrics)
//!     → Collector (OTLP/gRPC), optional
//! ```
//!
//! # Design Decisions
//! - One explicitly constructed `Telemetry` value is handed to every consumer;
//!   nothing is registered process-wide except the log subscriber
//! - Recording never fails a request
//! - Span export is optional to run without a collector

pub mod logging;
pub mod metrics;
pub mod traces;

use std::sync::Arc;

use thiserror::Error;

use crate::config::DemoConfig;
use crate::observability::logging::LogEmitter;
use crate::observability::metrics::MetricsRecorder;
use crate::observability::traces::{init_exporter, NoopExporter, TraceExporter};

/// Errors raised while wiring up telemetry at startup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to configure metrics: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to configure span exporter: {0}")]
    Traces(#[from] opentelemetry::trace::TraceError),

    #[error("failed to configure log exporter: {0}")]
    Logs(#[from] opentelemetry::logs::LogError),
}

/// Shared handles to every telemetry sink.
#[derive(Clone)]
pub struct Telemetry {
    pub metrics: Arc<MetricsRecorder>,
    pub logs: LogEmitter,
    pub traces: Arc<dyn TraceExporter>,
}

impl Telemetry {
    /// Build all sinks from configuration. Must run inside a tokio runtime
    /// when an OTLP endpoint is configured.
    pub fn from_config(config: &DemoConfig) -> Result<Self, TelemetryError> {
        Ok(Self {
            metrics: Arc::new(MetricsRecorder::new(&config.telemetry.metric_prefix)?),
            logs: LogEmitter::new(&config.service.name),
            traces: init_exporter(config.telemetry.otlp_endpoint.as_deref(), &config.service)?,
        })
    }

    /// Sinks with the given exporter and no collector wiring.
    pub fn with_exporter(config: &DemoConfig, traces: Arc<dyn TraceExporter>) -> Result<Self, TelemetryError> {
        Ok(Self {
            metrics: Arc::new(MetricsRecorder::new(&config.telemetry.metric_prefix)?),
            logs: LogEmitter::new(&config.service.name),
            traces,
        })
    }

    /// In-process sinks only: metrics are recorded, spans are dropped.
    pub fn local(config: &DemoConfig) -> Result<Self, TelemetryError> {
        Self::with_exporter(config, Arc::new(NoopExporter))
    }

    pub fn shutdown(&self) {
        self.traces.shutdown();
    }
}

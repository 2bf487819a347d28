//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Ship this crate's log events to the collector over OTLP, when configured
//! - Emit simulated log lines correlated with an operation
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)
//! - Correlation ids are plain fields so any collector can index them
//! - Only events from this crate reach the OTLP bridge; the exporter's own
//!   transport (tonic, h2, hyper) logs would otherwise feed back into it

use std::sync::Arc;

use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::{Logger, LoggerProvider};
use opentelemetry_sdk::runtime;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::{Filtered, Targets};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::schema::{LogFormat, ServiceConfig, TelemetryConfig};
use crate::observability::traces::resource;
use crate::observability::TelemetryError;
use crate::simulation::instance::Correlation;
use crate::simulation::template::LogLevel;

const CRATE_TARGET: &str = "telemetry_demo";

/// OTLP log pipeline. Disabled when no collector endpoint is configured.
#[derive(Default)]
pub struct LogExport {
    provider: Option<LoggerProvider>,
}

impl LogExport {
    /// Build the batch pipeline. Must run inside a tokio runtime when
    /// `endpoint` is set.
    pub fn new(endpoint: Option<&str>, service: &ServiceConfig) -> Result<Self, TelemetryError> {
        let Some(endpoint) = endpoint else {
            return Ok(Self::default());
        };

        let provider = opentelemetry_otlp::new_pipeline()
            .logging()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_resource(resource(service))
            .install_batch(runtime::Tokio)?;

        Ok(Self {
            provider: Some(provider),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Flush buffered records. Called once on shutdown.
    pub fn shutdown(&self) {
        if let Some(provider) = &self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Log exporter shutdown failed");
            }
        }
    }
}

/// Layer forwarding this crate's events at info and above to `provider`.
pub fn export_layer<S: tracing::Subscriber>(
    provider: &LoggerProvider,
) -> Filtered<OpenTelemetryTracingBridge<LoggerProvider, Logger>, Targets, S> {
    OpenTelemetryTracingBridge::new(provider)
        .with_filter(Targets::new().with_target(CRATE_TARGET, LevelFilter::INFO))
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(config: &TelemetryConfig, export: &LogExport) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},tower_http=debug", config.log_level))
    });

    let (json, pretty) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(export.provider.as_ref().map(export_layer))
        .init();

    if export.is_enabled() {
        tracing::info!("OTLP log export enabled");
    }
}

/// Initialize logging for tests (only logs errors).
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}

/// Emits the log lines of simulated operations.
#[derive(Debug, Clone)]
pub struct LogEmitter {
    service: Arc<str>,
}

impl LogEmitter {
    pub fn new(service: &str) -> Self {
        Self { service: Arc::from(service) }
    }

    pub fn log(&self, level: LogLevel, message: &str, correlation: Option<Correlation>) {
        let (trace_id, span_id, operation) = match correlation {
            Some(c) => (c.trace_id.to_string(), c.span_id.to_string(), c.operation),
            None => (String::new(), String::new(), ""),
        };
        let service = &*self.service;

        match level {
            LogLevel::Info => tracing::info!(service, %trace_id, %span_id, operation, "{}", message),
            LogLevel::Warn => tracing::warn!(service, %trace_id, %span_id, operation, "{}", message),
            LogLevel::Error => tracing::error!(service, %trace_id, %span_id, operation, "{}", message),
        }
    }
}

/// Records this thread's log events in memory for assertions.
#[cfg(test)]
pub(crate) struct CapturedLogs {
    exporter: opentelemetry_sdk::testing::logs::InMemoryLogsExporter,
    _provider: LoggerProvider,
    _guard: tracing::subscriber::DefaultGuard,
}

#[cfg(test)]
impl CapturedLogs {
    pub(crate) fn start() -> Self {
        let exporter = opentelemetry_sdk::testing::logs::InMemoryLogsExporter::default();
        let provider = LoggerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(export_layer(&provider)));
        Self {
            exporter,
            _provider: provider,
            _guard: guard,
        }
    }

    /// Debug rendering of every record so far, oldest first.
    pub(crate) fn records(&self) -> Vec<String> {
        self.exporter
            .get_emitted_logs()
            .unwrap_or_default()
            .iter()
            .map(|log| format!("{:?}", log.record))
            .collect()
    }

    pub(crate) fn contains(&self, message: &str) -> bool {
        self.records().iter().any(|r| r.contains(message))
    }
}

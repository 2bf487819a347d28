//! Span export.
//!
//! # Responsibilities
//! - Turn finished operation trees into OpenTelemetry spans
//! - Ship them to the collector over OTLP/gRPC through a batch processor
//!
//! # Design Decisions
//! - Spans are created after the fact with the recorded start/end times and
//!   the tree's own trace/span ids, so log lines and spans correlate
//! - No global tracer provider; the exporter owns its provider
//! - Export is best effort: failures surface through the SDK's own logging

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use opentelemetry::trace::{SpanBuilder, SpanKind, Status, TraceContextExt, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};

use crate::config::schema::ServiceConfig;
use crate::observability::TelemetryError;
use crate::simulation::instance::{AttrValue, OperationInstance};

/// Destination for finished operation trees.
pub trait TraceExporter: Send + Sync {
    /// Forward one tree. `started_at` is the wall-clock origin of its offsets.
    fn export(&self, started_at: SystemTime, root: &OperationInstance);

    /// Flush anything buffered. Called once on shutdown.
    fn shutdown(&self) {}
}

/// Drops every tree. Used when no collector is configured.
#[derive(Debug, Default)]
pub struct NoopExporter;

impl TraceExporter for NoopExporter {
    fn export(&self, _started_at: SystemTime, _root: &OperationInstance) {}
}

/// Keeps every exported tree in memory.
#[derive(Debug, Default)]
pub struct MemoryExporter {
    trees: Mutex<Vec<(SystemTime, OperationInstance)>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything exported so far, oldest first.
    pub fn trees(&self) -> Vec<OperationInstance> {
        match self.trees.lock() {
            Ok(trees) => trees.iter().map(|(_, t)| t.clone()).collect(),
            Err(poisoned) => poisoned.into_inner().iter().map(|(_, t)| t.clone()).collect(),
        }
    }
}

impl TraceExporter for MemoryExporter {
    fn export(&self, started_at: SystemTime, root: &OperationInstance) {
        match self.trees.lock() {
            Ok(mut trees) => trees.push((started_at, root.clone())),
            Err(poisoned) => poisoned.into_inner().push((started_at, root.clone())),
        }
    }
}

/// Exports to an OTLP collector.
pub struct OtlpExporter {
    provider: sdktrace::TracerProvider,
    tracer: sdktrace::Tracer,
}

impl OtlpExporter {
    /// Build the batch pipeline. Must run inside a tokio runtime.
    pub fn new(endpoint: &str, service: &ServiceConfig) -> Result<Self, TelemetryError> {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint);

        let provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(sdktrace::Config::default().with_resource(resource(service)))
            .install_batch(runtime::Tokio)?;
        let tracer = provider.tracer(env!("CARGO_PKG_NAME"));

        tracing::info!(endpoint, "OTLP span exporter configured");
        Ok(Self { provider, tracer })
    }

    fn emit(&self, node: &OperationInstance, parent: &Context, started_at: SystemTime) {
        let attributes: Vec<KeyValue> = node
            .attributes
            .iter()
            .map(|(key, value)| KeyValue::new(*key, to_otel(value)))
            .collect();
        let kind = if node.parent.is_none() {
            SpanKind::Server
        } else {
            SpanKind::Internal
        };

        let span = SpanBuilder::from_name(node.name)
            .with_trace_id(opentelemetry::trace::TraceId::from_bytes(node.trace_id.0.to_be_bytes()))
            .with_span_id(opentelemetry::trace::SpanId::from_bytes(node.span_id.0.to_be_bytes()))
            .with_kind(kind)
            .with_start_time(started_at + node.start)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, parent);
        let cx = parent.with_span(span);

        for child in &node.children {
            self.emit(child, &cx, started_at);
        }

        let span = cx.span();
        if node.is_error() {
            let message = node
                .attributes
                .get("error.message")
                .or_else(|| node.attributes.get("error.type"))
                .map(|v| v.to_string())
                .unwrap_or_default();
            span.set_status(Status::error(message));
        }
        span.end_with_timestamp(started_at + node.end);
    }
}

impl TraceExporter for OtlpExporter {
    fn export(&self, started_at: SystemTime, root: &OperationInstance) {
        self.emit(root, &Context::new(), started_at);
    }

    fn shutdown(&self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = %e, "Span exporter shutdown failed");
        }
    }
}

/// Resource attributes shared by every span from this process.
pub fn resource(service: &ServiceConfig) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", service.name.clone()),
        KeyValue::new("service.version", service.version.clone()),
        KeyValue::new("deployment.environment", service.environment.clone()),
        KeyValue::new("service.namespace", service.namespace.clone()),
    ])
}

fn to_otel(value: &AttrValue) -> opentelemetry::Value {
    match value {
        AttrValue::Bool(b) => (*b).into(),
        AttrValue::Int(i) => (*i).into(),
        AttrValue::Float(f) => (*f).into(),
        AttrValue::Str(s) => s.clone().into(),
    }
}

/// Exporter for the given endpoint, or a no-op one when there is none.
pub fn init_exporter(
    endpoint: Option<&str>,
    service: &ServiceConfig,
) -> Result<Arc<dyn TraceExporter>, TelemetryError> {
    match endpoint {
        Some(endpoint) => Ok(Arc::new(OtlpExporter::new(endpoint, service)?)),
        None => {
            tracing::info!("No OTLP endpoint configured, spans are not exported");
            Ok(Arc::new(NoopExporter))
        }
    }
}

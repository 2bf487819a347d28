//! Command-line and environment overrides.
//!
//! Every field is optional; only the ones present replace file values.

use clap::Args;

use crate::config::schema::{DemoConfig, LogFormat, RouteProfile};

#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// `service.name` resource attribute.
    #[arg(long, env = "OTEL_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// `deployment.environment` resource attribute.
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// `service.namespace` resource attribute.
    #[arg(long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Collector endpoint for spans; takes precedence over `--otlp-endpoint`.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT")]
    pub otlp_traces_endpoint: Option<String>,

    /// Collector endpoint for all signals.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Route template set.
    #[arg(long, env = "ROUTE_PROFILE", value_enum)]
    pub profile: Option<RouteProfile>,

    /// Metric name prefix.
    #[arg(long, env = "METRIC_PREFIX")]
    pub metric_prefix: Option<String>,

    /// Log level when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Run the periodic background job.
    #[arg(long, env = "BACKGROUND_ENABLED")]
    pub background_enabled: Option<bool>,

    /// Seconds between background job runs.
    #[arg(long, env = "BACKGROUND_INTERVAL_SECS")]
    pub background_interval_secs: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut DemoConfig) {
        if let Some(v) = &self.bind_address {
            config.listener.bind_address = v.clone();
        }
        if let Some(v) = &self.service_name {
            config.service.name = v.clone();
        }
        if let Some(v) = &self.environment {
            config.service.environment = v.clone();
        }
        if let Some(v) = &self.namespace {
            config.service.namespace = v.clone();
        }
        if let Some(v) = self.otlp_traces_endpoint.as_ref().or(self.otlp_endpoint.as_ref()) {
            config.telemetry.otlp_endpoint = Some(v.clone());
        }
        if let Some(v) = self.profile {
            config.routes.profile = v;
        }
        if let Some(v) = &self.metric_prefix {
            config.telemetry.metric_prefix = v.clone();
        }
        if let Some(v) = &self.log_level {
            config.telemetry.log_level = v.clone();
        }
        if let Some(v) = self.log_format {
            config.telemetry.log_format = v;
        }
        if let Some(v) = self.background_enabled {
            config.background.enabled = v;
        }
        if let Some(v) = self.background_interval_secs {
            config.background.interval_secs = v;
        }
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the demo service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the demo service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity attached to every piece of emitted telemetry.
    pub service: ServiceConfig,

    /// Exporter, metrics and logging settings.
    pub telemetry: TelemetryConfig,

    /// Which template set the routes run.
    pub routes: RoutesConfig,

    /// Periodic background job.
    pub background: BackgroundConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Resource attributes for the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// `service.name`.
    pub name: String,

    /// `service.version`.
    pub version: String,

    /// `deployment.environment`.
    pub environment: String,

    /// `service.namespace`.
    pub namespace: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "instrumented-app".to_string(),
            version: "1.0.0".to_string(),
            environment: "unknown".to_string(),
            namespace: "default".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Telemetry export configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// OTLP/gRPC collector endpoint for spans and logs. Export is off when unset.
    pub otlp_endpoint: Option<String>,

    /// Prefix for metric names (`app` gives `app_requests_total`).
    pub metric_prefix: String,

    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            metric_prefix: "app".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Route template set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RouteProfile {
    /// One simulated downstream step per route.
    Basic,
    /// Cache, auth, ML, batch query and external API sub-steps.
    Full,
}

/// Route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub profile: RouteProfile,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            profile: RouteProfile::Full,
        }
    }
}

/// Background job configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Run the periodic job.
    pub enabled: bool,

    /// Seconds between job starts.
    pub interval_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

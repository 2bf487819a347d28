//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Check the collector endpoint is a usable URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DemoConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::DemoConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("service.name must not be empty")]
    EmptyServiceName,

    #[error("telemetry.otlp_endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("telemetry.metric_prefix `{0}` is not a valid metric name prefix")]
    InvalidMetricPrefix(String),

    #[error("background.interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &DemoConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    if let Some(endpoint) = &config.telemetry.otlp_endpoint {
        if let Err(reason) = check_endpoint(endpoint) {
            errors.push(ValidationError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason,
            });
        }
    }

    if !is_metric_prefix(&config.telemetry.metric_prefix) {
        errors.push(ValidationError::InvalidMetricPrefix(config.telemetry.metric_prefix.clone()));
    }

    if config.background.enabled && config.background.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(endpoint: &str) -> Result<(), String> {
    let url = url::Url::parse(endpoint).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme `{}`", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

// Prometheus names: [a-zA-Z_:][a-zA-Z0-9_:]*
fn is_metric_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

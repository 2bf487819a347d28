//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define request, error and latency metrics per route
//! - Render the Prometheus text exposition for `/metrics`
//!
//! # Metrics
//! - `{prefix}_requests_total` (counter): requests by endpoint, method
//! - `{prefix}_errors_total` (counter): simulated errors by type, endpoint
//! - `{prefix}_request_duration_seconds` (histogram): latency by endpoint
//! - `{prefix}_background_jobs_total` (counter): completed background runs
//!
//! # Design Decisions
//! - The recorder is owned here and entered with `with_local_recorder`, so
//!   nothing is installed process-wide and tests get an isolated registry
//! - Updates are atomic inside the recorder; concurrent requests never lose increments
//! - Histogram buckets tuned for the simulated latencies (5ms to 5s)

use std::time::Duration;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::observability::TelemetryError;
use crate::simulation::errors::ErrorKind;

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

#[derive(Debug, Clone)]
struct MetricNames {
    requests: String,
    errors: String,
    duration: String,
    background: String,
}

impl MetricNames {
    fn new(prefix: &str) -> Self {
        Self {
            requests: format!("{}_requests_total", prefix),
            errors: format!("{}_errors_total", prefix),
            duration: format!("{}_request_duration_seconds", prefix),
            background: format!("{}_background_jobs_total", prefix),
        }
    }
}

/// Request metrics backed by a privately owned Prometheus recorder.
pub struct MetricsRecorder {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    names: MetricNames,
}

impl MetricsRecorder {
    pub fn new(prefix: &str) -> Result<Self, TelemetryError> {
        let names = MetricNames::new(prefix);
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(names.duration.clone()), DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        let this = Self { recorder, handle, names };
        this.describe();
        Ok(this)
    }

    fn describe(&self) {
        let names = &self.names;
        metrics::with_local_recorder(&self.recorder, || {
            metrics::describe_counter!(names.requests.clone(), "Total number of requests");
            metrics::describe_counter!(names.errors.clone(), "Total number of errors");
            metrics::describe_histogram!(
                names.duration.clone(),
                metrics::Unit::Seconds,
                "Request duration in seconds"
            );
            metrics::describe_counter!(names.background.clone(), "Completed background job runs");
        });
    }

    /// Count one request and observe its duration; count the error too, if any.
    pub fn record(&self, route: &str, method: &str, duration: Duration, error: Option<ErrorKind>) {
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!(
                self.names.requests.clone(),
                "endpoint" => route.to_string(),
                "method" => method.to_string()
            )
            .increment(1);

            if let Some(kind) = error {
                metrics::counter!(
                    self.names.errors.clone(),
                    "type" => kind.as_str(),
                    "endpoint" => route.to_string()
                )
                .increment(1);
            }

            metrics::histogram!(self.names.duration.clone(), "endpoint" => route.to_string())
                .record(duration.as_secs_f64());
        });
    }

    pub fn record_background_job(&self) {
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!(self.names.background.clone()).increment(1);
        });
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Drain histogram buffers; call periodically from a background task.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder").field("names", &self.names).finish()
    }
}

/// Value of the sample line `name{labels}` in a text exposition.
///
/// Every `key="value"` pair in `labels` must be present on the line.
pub fn sample_value(exposition: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    exposition.lines().find_map(|line| {
        let rest = line.strip_prefix(name)?;
        let (label_part, value) = match rest.strip_prefix('{') {
            Some(inner) => {
                let close = inner.rfind('}')?;
                (&inner[..close], inner[close + 1..].trim())
            }
            None if rest.starts_with(' ') => ("", rest.trim()),
            None => return None,
        };
        let all_match = labels
            .iter()
            .all(|(k, v)| label_part.split(',').any(|pair| pair == format!("{}=\"{}\"", k, v)));
        if all_match {
            value.parse().ok()
        } else {
            None
        }
    })
}

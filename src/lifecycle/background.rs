//! Periodic background job.
//!
//! # Responsibilities
//! - Build a `background_job` tree on a fixed interval
//! - Count completed runs and export their spans
//!
//! # Design Decisions
//! - Shutdown is observed between runs only; a run in progress finishes
//! - Shares the telemetry context with request handling, nothing else

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::observability::Telemetry;
use crate::simulation::builder::BuildContext;
use crate::simulation::instance::OperationInstance;
use crate::simulation::random::RandomSource;
use crate::simulation::template::OperationTemplate;

pub struct BackgroundJob {
    template: OperationTemplate,
    telemetry: Telemetry,
    interval: Duration,
}

impl BackgroundJob {
    pub fn new(template: OperationTemplate, telemetry: Telemetry, interval: Duration) -> Self {
        Self {
            template,
            telemetry,
            interval,
        }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Background job starting");

        let mut rng = StdRng::from_entropy();
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the first run waits a full interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once(&mut rng).await;
                }
                _ = shutdown.triggered() => {
                    tracing::info!("Background job received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Build, count and export one run.
    pub async fn run_once(&self, rng: &mut dyn RandomSource) -> OperationInstance {
        let mut ctx = BuildContext::new(rng, &self.telemetry.logs);
        let started_at = ctx.started_at();
        let tree = ctx.build(&self.template).await;

        self.telemetry.metrics.record_background_job();
        self.telemetry.traces.export(started_at, &tree);
        tracing::debug!(duration_ms = tree.duration().as_millis() as u64, "Background job finished");
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::DemoConfig;
    use crate::lifecycle::shutdown::Shutdown;
    use crate::observability::logging::CapturedLogs;
    use crate::observability::metrics::sample_value;
    use crate::observability::traces::MemoryExporter;
    use crate::routes::catalog::background_job;
    use crate::simulation::instance::AttrValue;

    fn job(interval: Duration) -> (BackgroundJob, Telemetry, Arc<MemoryExporter>) {
        let config = DemoConfig::default();
        let exporter = Arc::new(MemoryExporter::new());
        let telemetry = Telemetry::with_exporter(&config, exporter.clone()).unwrap();
        (BackgroundJob::new(background_job(), telemetry.clone(), interval), telemetry, exporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_builds_periodic_tree() {
        let (job, telemetry, exporter) = job(Duration::from_secs(10));
        let mut rng = StdRng::seed_from_u64(4);

        let tree = job.run_once(&mut rng).await;

        assert_eq!(tree.name, "background_job");
        assert_eq!(tree.attributes.get("job.type"), Some(&AttrValue::from("periodic")));
        let result = tree.attributes.get("job.result").and_then(|v| v.as_i64()).unwrap();
        assert!((0..=100).contains(&result));
        assert!(tree.duration() >= Duration::from_secs(1));
        assert!(tree.duration() <= Duration::from_secs(3));
        assert_eq!(exporter.trees().len(), 1);
        assert_eq!(
            sample_value(&telemetry.metrics.render(), "app_background_jobs_total", &[]),
            Some(1.0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_line_is_logged_when_the_run_starts() {
        let captured = CapturedLogs::start();
        let (job, _, exporter) = job(Duration::from_secs(10));

        let run = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(8);
            job.run_once(&mut rng).await
        });

        // Work takes at least a second; the line is already out halfway in.
        time::sleep(Duration::from_millis(500)).await;
        assert!(captured.contains("Background job running"));
        assert!(exporter.trees().is_empty());

        let tree = run.await.unwrap();
        assert_eq!(exporter.trees().len(), 1);
        let records = captured.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains(&tree.span_id.to_string()), "{}", records[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_interval_until_shutdown() {
        let (job, _, exporter) = job(Duration::from_secs(10));
        let shutdown = Shutdown::new();
        let task = tokio::spawn(job.run(shutdown.signal()));

        // Runs start at 10s and 20s and take at most 3s each.
        time::sleep(Duration::from_secs(25)).await;
        shutdown.trigger();
        task.await.unwrap();

        assert_eq!(exporter.trees().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_started_after_shutdown_never_runs() {
        let (job, _, exporter) = job(Duration::from_secs(10));
        let shutdown = Shutdown::new();
        shutdown.trigger();

        time::timeout(Duration::from_secs(1), job.run(shutdown.signal()))
            .await
            .unwrap();
        assert!(exporter.trees().is_empty());
    }
}

//! Traffic generator for the demo service.
//!
//! Drives random GET requests at the API routes so dashboards have
//! something to show, then prints a latency and status summary. Every request
//! carries its own `x-request-id` so server access logs can be matched up.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::seq::SliceRandom;

const DEFAULT_ROUTES: &[&str] = &["/", "/api/users", "/api/data", "/api/slow", "/api/error"];

#[derive(Parser)]
#[command(name = "telemetry-traffic")]
#[command(about = "Generate load against the instrumented demo service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Parallel workers.
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,

    #[arg(short, long, default_value_t = 30)]
    duration_secs: u64,

    /// Route to hit; repeat for several. Defaults to every API route.
    #[arg(short, long = "route")]
    routes: Vec<String>,
}

#[derive(Default)]
struct Report {
    statuses: BTreeMap<String, usize>,
    latencies: Vec<Duration>,
}

impl Report {
    fn merge(&mut self, other: Report) {
        for (status, count) in other.statuses {
            *self.statuses.entry(status).or_default() += count;
        }
        self.latencies.extend(other.latencies);
    }

    fn percentile(&self, p: f64) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let index = ((self.latencies.len() as f64 * p) as usize).min(self.latencies.len() - 1);
        Some(self.latencies[index])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let routes: Vec<String> = if cli.routes.is_empty() {
        DEFAULT_ROUTES.iter().map(|r| r.to_string()).collect()
    } else {
        cli.routes
    };
    let base = cli.url.trim_end_matches('/').to_string();
    let deadline = Instant::now() + Duration::from_secs(cli.duration_secs);
    let client = reqwest::Client::builder().timeout(Duration::from_secs(35)).build()?;

    println!(
        "Sending traffic to {} with {} workers for {}s",
        base, cli.concurrency, cli.duration_secs
    );

    let started = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..cli.concurrency.max(1) {
        let client = client.clone();
        let routes = routes.clone();
        let base = base.clone();
        tasks.push(tokio::spawn(async move {
            let mut report = Report::default();
            while Instant::now() < deadline {
                let Some(route) = routes.choose(&mut rand::thread_rng()).cloned() else {
                    break;
                };
                let request_start = Instant::now();
                let request = client
                    .get(format!("{}{}", base, route))
                    .header("x-request-id", uuid::Uuid::new_v4().to_string());
                let status = match request.send().await {
                    Ok(res) => res.status().as_u16().to_string(),
                    Err(e) if e.is_timeout() => "timeout".to_string(),
                    Err(_) => "connect_error".to_string(),
                };
                report.latencies.push(request_start.elapsed());
                *report.statuses.entry(status).or_default() += 1;
            }
            report
        }));
    }

    let mut report = Report::default();
    for task in tasks {
        report.merge(task.await?);
    }
    report.latencies.sort();

    let total = report.latencies.len();
    let elapsed = started.elapsed();
    println!("\n--- Traffic Results ---");
    println!("Total Requests: {}", total);
    println!("Total Duration: {:?}", elapsed);
    println!("Requests/sec:   {:.2}", total as f64 / elapsed.as_secs_f64().max(f64::EPSILON));
    for (label, p) in [("P50", 0.50), ("P95", 0.95), ("P99", 0.99)] {
        if let Some(latency) = report.percentile(p) {
            println!("{} Latency:    {:?}", label, latency);
        }
    }
    for (status, count) in &report.statuses {
        println!("Status {:>13}: {}", status, count);
    }
    println!("-----------------------\n");

    Ok(())
}

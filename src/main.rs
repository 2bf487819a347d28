//! Instrumented demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routes::RouteHandler
//!                                          │
//!                                          ├─▶ simulation::builder (operation tree, sleeps)
//!                                          ├─▶ simulation::errors  (error route only)
//!                                          │
//!                                          └─▶ observability
//!                                               ├─ metrics  ──▶ GET /metrics
//!                                               ├─ logging  ──▶ stdout + OTLP collector
//!                                               └─ traces   ──▶ OTLP collector
//!
//!     lifecycle: signals ──▶ Shutdown ──▶ server drain + background job stop
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use telemetry_demo::config::{resolve_config, Overrides};
use telemetry_demo::lifecycle::signals::shutdown_on_signal;
use telemetry_demo::observability::logging::{init_logging, LogExport};
use telemetry_demo::{HttpServer, Shutdown, Telemetry};

#[derive(Parser)]
#[command(name = "telemetry-demo", version)]
#[command(about = "HTTP service that emits simulated metrics, logs and traces", long_about = None)]
struct Cli {
    /// Optional TOML config file; flags and environment override it.
    #[arg(short, long, env = "DEMO_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), &cli.overrides)?;

    let log_export = LogExport::new(config.telemetry.otlp_endpoint.as_deref(), &config.service)?;
    init_logging(&config.telemetry, &log_export);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        service_version = %config.service.version,
        environment = %config.service.environment,
        namespace = %config.service.namespace,
        "telemetry-demo starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        profile = ?config.routes.profile,
        otlp_endpoint = config.telemetry.otlp_endpoint.as_deref().unwrap_or("none"),
        background = config.background.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let telemetry = Telemetry::from_config(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, telemetry.clone());
    let server_shutdown = shutdown.signal();

    let signals = tokio::spawn(async move {
        shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;
    signals.abort();

    telemetry.shutdown();
    tracing::info!("Shutdown complete");
    log_export.shutdown();
    Ok(())
}

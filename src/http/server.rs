//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with one handler per simulated route
//! - Wire up middleware (access logs, timeout, request ID)
//! - Expose the metrics registry at `/metrics`
//! - Run the background job next to the server until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Request, routing::get, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::DemoConfig;
use crate::http::handlers::{metrics_handler, route_handler};
use crate::lifecycle::{BackgroundJob, ShutdownSignal};
use crate::observability::Telemetry;
use crate::routes::{Route, RouteCatalog, RouteHandler};

pub const X_REQUEST_ID: &str = "x-request-id";

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<RouteHandler>,
}

/// HTTP server for the demo service.
pub struct HttpServer {
    router: Router,
    config: DemoConfig,
    handler: Arc<RouteHandler>,
}

impl HttpServer {
    pub fn new(config: DemoConfig, telemetry: Telemetry) -> Self {
        let catalog = RouteCatalog::new(config.routes.profile);
        let handler = Arc::new(RouteHandler::new(catalog, telemetry, config.service.clone()));
        let state = AppState {
            handler: Arc::clone(&handler),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            handler,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &DemoConfig, state: AppState) -> Router {
        let mut router = Router::new();
        for route in Route::ALL {
            router = router.route(route.path(), route_handler(route));
        }

        router
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. The background job and metrics upkeep run alongside.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            environment = %self.config.service.environment,
            profile = ?self.config.routes.profile,
            "HTTP server starting"
        );

        let background = if self.config.background.enabled {
            let job = BackgroundJob::new(
                self.handler.catalog().background().clone(),
                self.handler.telemetry().clone(),
                Duration::from_secs(self.config.background.interval_secs),
            );
            Some(tokio::spawn(job.run(shutdown.clone())))
        } else {
            None
        };

        let metrics = Arc::clone(&self.handler.telemetry().metrics);
        let mut upkeep_shutdown = shutdown.clone();
        let upkeep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => metrics.run_upkeep(),
                    _ = upkeep_shutdown.triggered() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.triggered().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        if let Some(job) = background {
            if let Err(e) = job.await {
                tracing::warn!(error = %e, "Background job task failed");
            }
        }
        let _ = upkeep.await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }
}

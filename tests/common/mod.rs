//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use telemetry_demo::config::RouteProfile;
use telemetry_demo::observability::traces::MemoryExporter;
use telemetry_demo::{DemoConfig, HttpServer, Shutdown, Telemetry};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A demo server running on an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub exporter: Arc<MemoryExporter>,
    pub client: reqwest::Client,
    pub shutdown: Shutdown,
    pub server: JoinHandle<()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn metrics(&self) -> String {
        self.get("/metrics").await.text().await.unwrap()
    }

    #[allow(dead_code)]
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.server)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}

/// Start a server with the given route profile. The background job is off
/// so exported trees come from requests only.
pub async fn spawn_app(profile: RouteProfile) -> TestApp {
    let mut config = DemoConfig::default();
    config.routes.profile = profile;
    config.background.enabled = false;
    config.listener.bind_address = "127.0.0.1:0".into();

    let exporter = Arc::new(MemoryExporter::new());
    let telemetry = Telemetry::with_exporter(&config, exporter.clone()).unwrap();

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.signal();
    let server = tokio::spawn(async move {
        HttpServer::new(config, telemetry)
            .run(listener, server_shutdown)
            .await
            .unwrap();
    });

    TestApp {
        addr,
        exporter,
        client: reqwest::Client::new(),
        shutdown,
        server,
    }
}

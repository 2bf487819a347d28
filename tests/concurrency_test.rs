//! Concurrent request handling.

use std::collections::HashSet;

use telemetry_demo::config::RouteProfile;
use telemetry_demo::observability::metrics::sample_value;

mod common;

#[tokio::test]
async fn test_concurrent_users_requests_are_all_counted() {
    let app = common::spawn_app(RouteProfile::Full).await;
    let concurrency = 40;

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = app.client.clone();
        let url = app.url("/api/users");
        tasks.push(tokio::spawn(async move {
            client.get(url).send().await.unwrap().status().as_u16()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 200);
    }

    let text = app.metrics().await;
    assert_eq!(
        sample_value(&text, "app_requests_total", &[("endpoint", "/api/users"), ("method", "GET")]),
        Some(concurrency as f64)
    );
    assert_eq!(
        sample_value(&text, "app_request_duration_seconds_count", &[("endpoint", "/api/users")]),
        Some(concurrency as f64)
    );

    // Each request owns its own trace.
    let trees = app.exporter.trees();
    assert_eq!(trees.len(), concurrency);
    let traces: HashSet<_> = trees.iter().map(|t| t.trace_id).collect();
    assert_eq!(traces.len(), concurrency);

    app.stop().await;
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_request() {
    let app = common::spawn_app(RouteProfile::Basic).await;

    let client = app.client.clone();
    let url = app.url("/api/slow");
    let in_flight = tokio::spawn(async move { client.get(url).send().await.map(|r| r.status().as_u16()) });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let exporter = app.exporter.clone();
    app.stop().await;

    assert_eq!(in_flight.await.unwrap().unwrap(), 200);
    assert_eq!(exporter.trees().len(), 1);
}

//! Per-request simulation.

use std::borrow::Cow;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};

use crate::config::schema::ServiceConfig;
use crate::observability::Telemetry;
use crate::routes::catalog::USERS;
use crate::routes::{Route, RouteCatalog, RouteSpec, ENDPOINTS};
use crate::simulation::builder::BuildContext;
use crate::simulation::errors::{ErrorInjector, ErrorKind, ErrorScenario};
use crate::simulation::instance::OperationInstance;
use crate::simulation::random::RandomSource;
use crate::simulation::template::{round_to, LogLevel, OperationTemplate};

/// Outcome of one simulated request.
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub route: Route,
    pub status: u16,
    pub payload: Value,
    /// Wall time of the whole root operation.
    pub duration: Duration,
    pub tree: OperationInstance,
    pub started_at: SystemTime,
    pub error: Option<ErrorKind>,
}

/// Serves routes from a catalog, reporting to a telemetry context.
#[derive(Clone)]
pub struct RouteHandler {
    catalog: RouteCatalog,
    telemetry: Telemetry,
    service: ServiceConfig,
}

impl RouteHandler {
    pub fn new(catalog: RouteCatalog, telemetry: Telemetry, service: ServiceConfig) -> Self {
        Self {
            catalog,
            telemetry,
            service,
        }
    }

    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Simulate one request end to end. Never fails; simulated errors are
    /// reported through the status code and payload.
    pub async fn handle(&self, route: Route, rng: &mut dyn RandomSource) -> RouteResult {
        let spec = self.catalog.get(route);
        let logs = &self.telemetry.logs;

        if let Some(line) = &spec.entry_log {
            logs.log(line.level, line.message, None);
        }

        let scenario = ErrorInjector::maybe_inject(&spec.scenarios, rng);
        let template: Cow<'_, OperationTemplate> = match scenario.and_then(|s| s.subtree.as_ref()) {
            Some(subtree) => Cow::Owned(spec.template.clone().child(subtree.clone())),
            None => Cow::Borrowed(&spec.template),
        };

        let mut ctx = BuildContext::new(rng, logs);
        let started_at = ctx.started_at();
        let mut tree = ctx.build(&template).await;

        if let Some(scenario) = scenario {
            ErrorInjector::apply(&mut tree, scenario);
            let failing = scenario
                .failing_operation
                .and_then(|name| tree.find(name))
                .unwrap_or(&tree);
            logs.log(LogLevel::Error, scenario.log_message, Some(failing.correlation()));
        }

        let (status, payload) = match scenario {
            Some(scenario) => (scenario.status(), error_payload(scenario)),
            None => (200, self.payload(spec, &tree, started_at)),
        };
        let duration = tree.duration();
        let error = scenario.map(|s| s.kind);

        if !route.is_probe() {
            self.telemetry.metrics.record(route.path(), "GET", duration, error);
        }
        if route == Route::Data {
            logs.log(LogLevel::Info, &format!("Generated data: {}", payload), Some(tree.correlation()));
        }
        self.telemetry.traces.export(started_at, &tree);

        tracing::debug!(
            route = route.path(),
            status,
            duration_ms = duration.as_millis() as u64,
            spans = tree.span_count(),
            trace_id = %tree.trace_id,
            "Simulated request"
        );

        RouteResult {
            route,
            status,
            payload,
            duration,
            tree,
            started_at,
            error,
        }
    }

    fn payload(&self, spec: &RouteSpec, tree: &OperationInstance, started_at: SystemTime) -> Value {
        match spec.route {
            Route::Home => json!({
                "message": "Hello from the instrumented demo app",
                "environment": self.service.environment,
                "service": self.service.name,
                "endpoints": ENDPOINTS,
            }),
            Route::Users => json!(USERS),
            Route::Data => {
                let timestamp = started_at
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or_default();
                let mut body = Map::new();
                body.insert("timestamp".into(), json!(timestamp));
                body.insert("value".into(), json!(tree.find_attr("data.value")));
                body.insert("status".into(), json!("success"));
                if let Some(confidence) = tree.find_attr("data.confidence") {
                    body.insert("confidence".into(), json!(confidence));
                }
                body.insert("environment".into(), json!(self.service.environment));
                Value::Object(body)
            }
            Route::Slow => json!({
                "message": "Slow operation completed",
                "duration_seconds": round_to(tree.duration().as_secs_f64(), 2),
                "operations": spec.summary,
            }),
            // The error route only reaches here if its profile has no scenarios.
            Route::Error => json!({ "status": "ok" }),
            Route::Health => json!({
                "status": "healthy",
                "environment": self.service.environment,
            }),
            Route::Ready => json!({ "status": "ready" }),
        }
    }
}

fn error_payload(scenario: &ErrorScenario) -> Value {
    let mut body = Map::new();
    body.insert("error".into(), json!(scenario.message));
    for (key, value) in &scenario.extra {
        body.insert((*key).into(), json!(value));
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::schema::RouteProfile;
    use crate::config::DemoConfig;
    use crate::observability::metrics::sample_value;
    use crate::observability::traces::MemoryExporter;
    use crate::simulation::instance::AttrValue;

    fn handler(profile: RouteProfile) -> (RouteHandler, Arc<MemoryExporter>) {
        let config = DemoConfig::default();
        let exporter = Arc::new(MemoryExporter::new());
        let telemetry = Telemetry::with_exporter(&config, exporter.clone()).unwrap();
        (
            RouteHandler::new(RouteCatalog::new(profile), telemetry, config.service.clone()),
            exporter,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_users_route_returns_fixture_and_exports_tree() {
        let (handler, exporter) = handler(RouteProfile::Full);
        let mut rng = StdRng::seed_from_u64(7);

        let result = handler.handle(Route::Users, &mut rng).await;

        assert_eq!(result.status, 200);
        assert_eq!(result.payload.as_array().map(|u| u.len()), Some(3));
        assert_eq!(result.payload[0]["name"], "Alice");
        assert_eq!(result.tree.attributes.get("user.count"), Some(&AttrValue::Int(3)));
        assert!(result.tree.find("cache.check").is_some());
        assert!(result.tree.intervals_nest());

        let trees = exporter.trees();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].trace_id, result.tree.trace_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_route_status_matches_injected_kind() {
        let (handler, _) = handler(RouteProfile::Full);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..20 {
            let result = handler.handle(Route::Error, &mut rng).await;
            let kind = result.error.expect("error route always fails");
            assert_eq!(result.status, kind.status());
            assert!(result.payload["error"].is_string());
            assert_eq!(result.tree.attributes.get("error"), Some(&AttrValue::Bool(true)));
            if kind == ErrorKind::ValidationError {
                assert_eq!(result.payload["field"], "email");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadlock_marks_path_to_failing_query() {
        let (handler, _) = handler(RouteProfile::Full);
        let mut rng = StdRng::seed_from_u64(3);

        let result = loop {
            let result = handler.handle(Route::Error, &mut rng).await;
            if result.error == Some(ErrorKind::DatabaseError) {
                break result;
            }
        };

        let tree = &result.tree;
        let failing = tree.find("db.execute_query").unwrap();
        assert_eq!(failing.attributes.get("error.type"), Some(&AttrValue::from("deadlock")));
        let transaction = tree.find("db.transaction").unwrap();
        assert_eq!(transaction.attributes.get("error.type"), Some(&AttrValue::from("database_error")));
        assert_eq!(tree.attributes.get("error.type"), Some(&AttrValue::from("db_error")));
        assert!(tree.find("auth.check").is_some_and(|a| !a.is_error()));
        assert!(!tree.find("db.begin_transaction").unwrap().is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_count_routes_but_not_probes() {
        let (handler, exporter) = handler(RouteProfile::Basic);
        let mut rng = StdRng::seed_from_u64(5);

        handler.handle(Route::Data, &mut rng).await;
        handler.handle(Route::Data, &mut rng).await;
        handler.handle(Route::Health, &mut rng).await;
        handler.handle(Route::Error, &mut rng).await;

        let text = handler.telemetry().metrics.render();
        assert_eq!(
            sample_value(&text, "app_requests_total", &[("endpoint", "/api/data"), ("method", "GET")]),
            Some(2.0)
        );
        assert_eq!(sample_value(&text, "app_requests_total", &[("endpoint", "/health")]), None);
        let errors: f64 = ErrorKind::ALL
            .iter()
            .filter_map(|k| sample_value(&text, "app_errors_total", &[("type", k.as_str())]))
            .sum();
        assert_eq!(errors, 1.0);
        assert_eq!(exporter.trees().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_route_reports_its_elapsed_time() {
        let (handler, _) = handler(RouteProfile::Full);
        let mut rng = StdRng::seed_from_u64(9);

        let result = handler.handle(Route::Slow, &mut rng).await;
        let minimum = handler.catalog().get(Route::Slow).template.guaranteed_minimum();

        assert!(result.duration >= minimum);
        let reported = result.payload["duration_seconds"].as_f64().unwrap();
        assert!((reported - result.duration.as_secs_f64()).abs() <= 0.01);
        assert_eq!(
            result.payload["operations"],
            json!(["compute", "database_queries", "external_apis"])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_data_route_payload() {
        let (handler, _) = handler(RouteProfile::Full);
        let mut rng = StdRng::seed_from_u64(1);

        let result = handler.handle(Route::Data, &mut rng).await;
        let value = result.payload["value"].as_i64().unwrap();
        assert!((1..=100).contains(&value));
        assert_eq!(result.payload["status"], "success");
        let confidence = result.payload["confidence"].as_f64().unwrap();
        assert!((0.8..=0.99).contains(&confidence));
    }
}

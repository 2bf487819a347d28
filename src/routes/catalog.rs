//! Operation templates for every route, per profile.
//!
//! The `full` profile models cache, auth, ML, batch query and external API
//! sub-steps; `basic` keeps a single simulated downstream call per route.

use serde::Serialize;

use crate::config::schema::RouteProfile;
use crate::routes::{Route, RouteSpec};
use crate::simulation::errors::{ErrorKind, ErrorScenario};
use crate::simulation::instance::AttrValue;
use crate::simulation::template::{AttributeGenerator, Condition, LogLevel, LogLine, OperationTemplate};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct User {
    pub id: u32,
    pub name: &'static str,
    pub email: &'static str,
}

/// Rows the simulated user database returns.
pub const USERS: [User; 3] = [
    User { id: 1, name: "Alice", email: "alice@example.com" },
    User { id: 2, name: "Bob", email: "bob@example.com" },
    User { id: 3, name: "Charlie", email: "charlie@example.com" },
];

pub fn route_spec(profile: RouteProfile, route: Route) -> RouteSpec {
    match (route, profile) {
        (Route::Home, _) => RouteSpec::new(route, home()),
        (Route::Users, RouteProfile::Full) => RouteSpec::new(route, users_full()),
        (Route::Users, RouteProfile::Basic) => RouteSpec::new(route, users_basic()),
        (Route::Data, RouteProfile::Full) => RouteSpec::new(route, data_full()),
        (Route::Data, RouteProfile::Basic) => RouteSpec::new(route, data_basic()),
        (Route::Slow, RouteProfile::Full) => RouteSpec::new(route, slow_full())
            .entry_log(SLOW_ENTRY)
            .summary(["compute", "database_queries", "external_apis"]),
        (Route::Slow, RouteProfile::Basic) => RouteSpec::new(route, slow_basic())
            .entry_log(SLOW_ENTRY)
            .summary(["compute"]),
        (Route::Error, RouteProfile::Full) => RouteSpec::new(route, error_root(true)).scenarios(scenarios_full()),
        (Route::Error, RouteProfile::Basic) => RouteSpec::new(route, error_root(false)).scenarios(scenarios_basic()),
        (Route::Health, _) => RouteSpec::new(route, probe("health", Route::Health)),
        (Route::Ready, _) => RouteSpec::new(route, probe("ready", Route::Ready)),
    }
}

const SLOW_ENTRY: LogLine = LogLine::new(
    LogLevel::Warn,
    "Slow endpoint called - complex operation starting",
);

fn root(name: &'static str, route: Route) -> OperationTemplate {
    OperationTemplate::new(name)
        .attr("http.route", route.path())
        .attr("http.method", "GET")
}

fn home() -> OperationTemplate {
    OperationTemplate::new("home")
        .attr("http.route", Route::Home.path())
        .log(LogLevel::Info, "Home endpoint accessed")
}

fn probe(name: &'static str, route: Route) -> OperationTemplate {
    OperationTemplate::new(name).attr("http.route", route.path())
}

fn users_response_size() -> usize {
    serde_json::to_string(&USERS).map(|s| s.len()).unwrap_or_default()
}

fn user_count() -> AttributeGenerator {
    AttributeGenerator::FromChild {
        child: "db.query",
        key: "db.rows_returned",
        fallback: Some(AttrValue::from(USERS.len())),
    }
}

fn users_query() -> OperationTemplate {
    OperationTemplate::new("db.query")
        .attr("db.system", "postgresql")
        .attr("db.name", "userdb")
        .attr("db.statement", "SELECT * FROM users WHERE active = true")
        .attr("db.operation", "SELECT")
        .attr("db.rows_returned", USERS.len())
        .log(LogLevel::Info, "Retrieved {db.rows_returned} users from database")
}

fn users_full() -> OperationTemplate {
    let cache_miss = || Condition::sibling("cache.check", "cache.hit", false);

    let profiles = USERS.iter().map(|user| {
        OperationTemplate::new("http.get_user_profile")
            .attr("http.url", format!("https://api.profiles.com/v1/users/{}", user.id))
            .attr("http.method", "GET")
            .attr("user.id", user.id as i64)
            .lasting(0.01, 0.03)
    });

    root("get_users", Route::Users)
        .child(
            OperationTemplate::new("cache.check")
                .attr("cache.type", "redis")
                .attr("cache.key", "users:list")
                .generate("cache.hit", AttributeGenerator::Flip)
                .lasting(0.005, 0.015)
                .log_if("cache.hit", true, LogLevel::Info, "Cache hit for users list")
                .log_if("cache.hit", false, LogLevel::Info, "Cache miss for users list"),
        )
        .child(
            users_query()
                .when(cache_miss())
                .child(OperationTemplate::new("db.connection.acquire").lasting(0.002, 0.008))
                .child(OperationTemplate::new("db.query.execute").lasting(0.02, 0.08)),
        )
        .child(
            OperationTemplate::new("service.enrich_users")
                .attr("enrichment.type", "profile_data")
                .generate("users.enriched", AttributeGenerator::ChildCount)
                .when(cache_miss())
                .children(profiles),
        )
        .child(
            OperationTemplate::new("cache.set")
                .attr("cache.type", "redis")
                .attr("cache.key", "users:list")
                .attr("cache.ttl", 300)
                .lasting(0.005, 0.015)
                .when(cache_miss())
                .log(LogLevel::Info, "Updated cache with users list"),
        )
        .generate("user.count", user_count())
        .attr("response.size_bytes", users_response_size())
}

fn users_basic() -> OperationTemplate {
    root("get_users", Route::Users)
        .child(users_query().lasting(0.02, 0.08))
        .generate("user.count", user_count())
}

fn data_full() -> OperationTemplate {
    root("get_data", Route::Data)
        .child(
            OperationTemplate::new("auth.validate_token")
                .attr("auth.method", "jwt")
                .generate(
                    "auth.user_id",
                    AttributeGenerator::PrefixedId { prefix: "user_", min: 100, max: 999 },
                )
                .lasting(0.005, 0.015)
                .log(LogLevel::Info, "Token validated successfully"),
        )
        .child(
            OperationTemplate::new("data.aggregate")
                .child(
                    OperationTemplate::new("timeseries.query")
                        .attr("db.system", "influxdb")
                        .attr("db.query", "SELECT mean(value) FROM metrics WHERE time > now() - 1h")
                        .generate("data.value", AttributeGenerator::IntRange { min: 1, max: 100 })
                        .attr("query.result_count", 1)
                        .lasting(0.02, 0.05),
                )
                .child(
                    OperationTemplate::new("analytics.query")
                        .attr("db.system", "clickhouse")
                        .attr("db.query", "SELECT count(*) FROM events WHERE date = today()")
                        .generate("query.result_count", AttributeGenerator::IntRange { min: 1000, max: 5000 })
                        .lasting(0.03, 0.07),
                )
                .child(
                    OperationTemplate::new("ml.predict")
                        .attr("ml.model", "forecast-v2")
                        .attr("ml.input_features", 5)
                        .child(OperationTemplate::new("ml.preprocessing").lasting(0.01, 0.02))
                        .child(OperationTemplate::new("ml.inference").lasting(0.02, 0.04))
                        .generate(
                            "data.confidence",
                            AttributeGenerator::FloatRange { min: 0.8, max: 0.99, decimals: 2 },
                        ),
                )
                .generate("sources.count", AttributeGenerator::ChildCount),
        )
        .child(
            OperationTemplate::new("data.transform")
                .attr("transform.operations", "normalize,aggregate,filter")
                .attr("output.fields", 4)
                .lasting(0.01, 0.03),
        )
        .child(
            OperationTemplate::new("cache.store")
                .attr("cache.type", "redis")
                .generate("cache.key", AttributeGenerator::TimestampKey { prefix: "data:" })
                .attr("cache.ttl", 60)
                .lasting(0.005, 0.010),
        )
        .attr("response.status", "success")
}

fn data_basic() -> OperationTemplate {
    root("get_data", Route::Data)
        .child(
            OperationTemplate::new("data.process")
                .generate("data.value", AttributeGenerator::IntRange { min: 1, max: 100 })
                .attr("output.fields", 4)
                .lasting(0.05, 0.15),
        )
        .attr("response.status", "success")
}

fn heavy_calculation() -> OperationTemplate {
    OperationTemplate::new("compute.heavy_calculation")
        .attr("compute.type", "matrix_multiplication")
        .generate("compute.duration_ms", AttributeGenerator::SampledMillis)
}

fn slow_total() -> AttributeGenerator {
    AttributeGenerator::ElapsedSeconds { decimals: 2 }
}

fn slow_full() -> OperationTemplate {
    let query = |name: &'static str, statement: &'static str, min: f64, max: f64| {
        OperationTemplate::new(name)
            .attr("db.statement", statement)
            .lasting(min, max)
    };
    let call = |name: &'static str, url: &'static str, method: &'static str, min: f64, max: f64| {
        OperationTemplate::new(name)
            .attr("http.url", url)
            .attr("http.method", method)
            .lasting(min, max)
    };

    root("slow_endpoint", Route::Slow)
        .child(heavy_calculation().attr("compute.size", 1000).lasting(0.2, 0.5))
        .child(
            OperationTemplate::new("db.batch_queries")
                .child(query("db.query_aggregation", "SELECT * FROM orders JOIN customers", 0.15, 0.3))
                .child(query(
                    "db.query_analytics",
                    "SELECT date, SUM(amount) FROM transactions GROUP BY date",
                    0.1,
                    0.25,
                ))
                .child(query(
                    "db.query_reports",
                    "SELECT * FROM reports WHERE status = 'pending'",
                    0.1,
                    0.2,
                ))
                .generate("db.query_count", AttributeGenerator::ChildCount),
        )
        .child(
            OperationTemplate::new("external.api_calls")
                .child(call(
                    "http.post_notification",
                    "https://notifications.service/api/send",
                    "POST",
                    0.15,
                    0.3,
                ))
                .child(call("http.get_weather", "https://weather.api/current", "GET", 0.1, 0.25))
                .child(call(
                    "http.update_inventory",
                    "https://inventory.service/api/sync",
                    "PUT",
                    0.1,
                    0.2,
                ))
                .generate("api.call_count", AttributeGenerator::ChildCount),
        )
        .generate("total.duration_seconds", slow_total())
        .log(LogLevel::Warn, "Slow operation completed in {total.duration_seconds}s")
}

fn slow_basic() -> OperationTemplate {
    root("slow_endpoint", Route::Slow)
        .child(heavy_calculation().lasting(0.5, 1.5))
        .generate("total.duration_seconds", slow_total())
        .log(LogLevel::Warn, "Slow operation completed in {total.duration_seconds}s")
}

fn error_root(with_auth: bool) -> OperationTemplate {
    let root = root("error_endpoint", Route::Error);
    if !with_auth {
        return root;
    }
    root.child(
        OperationTemplate::new("auth.check")
            .attr("auth.method", "bearer")
            .attr("auth.success", true)
            .lasting(0.01, 0.02),
    )
}

fn scenarios_full() -> Vec<ErrorScenario> {
    vec![
        ErrorScenario::new(ErrorKind::DatabaseError, "Database error - transaction deadlock")
            .logging("Database deadlock error occurred")
            .running(
                OperationTemplate::new("db.transaction")
                    .attr("db.system", "postgresql")
                    .attr("db.operation", "UPDATE")
                    .child(OperationTemplate::new("db.begin_transaction").lasting(0.005, 0.01))
                    .child(OperationTemplate::new("db.execute_query").lasting(0.02, 0.04)),
            )
            .failing_at("db.execute_query")
            .attr("error.type", "deadlock")
            .attr("error.message", "Deadlock detected")
            .ancestor_attr("db.transaction", "error.type", "database_error"),
        ErrorScenario::new(ErrorKind::Timeout, "Payment service timeout")
            .logging("Payment API timeout")
            .running(
                OperationTemplate::new("business.process_order")
                    .child(OperationTemplate::new("cache.get").lasting(0.005, 0.01))
                    .child(
                        OperationTemplate::new("http.call_payment_api")
                            .attr("http.url", "https://payment.gateway/api/charge")
                            .attr("http.method", "POST")
                            .lasting(0.5, 1.0),
                    ),
            )
            .failing_at("http.call_payment_api")
            .attr("error.type", "timeout")
            .attr("error.message", "Request timeout after 30s")
            .ancestor_attr("business.process_order", "error.type", "downstream_timeout"),
        ErrorScenario::new(ErrorKind::ValidationError, "Validation failed")
            .logging("Validation error: Invalid email format")
            .extra("field", "email")
            .running(
                OperationTemplate::new("validation.check_input")
                    .child(OperationTemplate::new("validation.schema_check").lasting(0.005, 0.01))
                    .child(OperationTemplate::new("validation.business_rules").lasting(0.01, 0.02)),
            )
            .failing_at("validation.business_rules")
            .attr("error.type", "validation_failed")
            .attr("error.message", "Invalid email format")
            .ancestor_attr("validation.check_input", "validation.failed_field", "email"),
        ErrorScenario::new(ErrorKind::NotFound, "Resource not found")
            .logging("Resource not found in database")
            .running(
                OperationTemplate::new("db.find_resource")
                    .attr("db.system", "postgresql")
                    .attr("db.statement", "SELECT * FROM resources WHERE id = $1")
                    .attr("db.rows_returned", 0)
                    .lasting(0.02, 0.04),
            )
            .failing_at("db.find_resource"),
    ]
}

fn scenarios_basic() -> Vec<ErrorScenario> {
    vec![
        ErrorScenario::new(ErrorKind::DatabaseError, "Database error").logging("Database error occurred"),
        ErrorScenario::new(ErrorKind::Timeout, "Request timeout"),
        ErrorScenario::new(ErrorKind::ValidationError, "Validation failed").logging("Validation error"),
        ErrorScenario::new(ErrorKind::NotFound, "Resource not found"),
    ]
}

/// Periodic job run by the background task.
pub fn background_job() -> OperationTemplate {
    OperationTemplate::new("background_job")
        .attr("job.type", "periodic")
        .generate("job.result", AttributeGenerator::IntRange { min: 0, max: 100 })
        .lasting(1.0, 3.0)
        .log_on_start(LogLevel::Info, "Background job running")
}

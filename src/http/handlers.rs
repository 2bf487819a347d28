//! Axum handlers.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::http::server::AppState;
use crate::routes::Route;

/// GET handler for one simulated route.
pub fn route_handler(route: Route) -> MethodRouter<AppState> {
    get(move |State(state): State<AppState>| simulate(state, route))
}

async fn simulate(state: AppState, route: Route) -> Response {
    let mut rng = StdRng::from_entropy();
    let result = state.handler.handle(route, &mut rng).await;
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result.payload)).into_response()
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.handler.telemetry().metrics.render(),
    )
}

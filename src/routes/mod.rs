//! Route catalog and per-request simulation.
//!
//! # Data Flow
//! ```text
//! Request → RouteHandler::handle
//!     → pick error scenario (error route only)
//!     → build operation tree (sleeps for simulated work)
//!     → apply scenario → assemble response
//!     → record metrics → export spans
//! ```
//!
//! # Design Decisions
//! - The catalog is immutable after startup and shared by every request
//! - Each profile defines every route exactly once

pub mod catalog;
pub mod handler;

use crate::config::schema::RouteProfile;
use crate::simulation::errors::ErrorScenario;
use crate::simulation::template::{LogLine, OperationTemplate};

pub use handler::{RouteHandler, RouteResult};

/// HTTP routes served by the demo service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Users,
    Data,
    Slow,
    Error,
    Health,
    Ready,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Home,
        Route::Users,
        Route::Data,
        Route::Slow,
        Route::Error,
        Route::Health,
        Route::Ready,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Users => "/api/users",
            Route::Data => "/api/data",
            Route::Slow => "/api/slow",
            Route::Error => "/api/error",
            Route::Health => "/health",
            Route::Ready => "/ready",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|r| r.path() == path)
    }

    /// Liveness and readiness probes are not counted in request metrics.
    pub fn is_probe(&self) -> bool {
        matches!(self, Route::Health | Route::Ready)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Paths advertised by the home route.
pub const ENDPOINTS: [&str; 6] = ["/api/users", "/api/data", "/api/slow", "/api/error", "/health", "/metrics"];

/// Everything needed to serve one route.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub route: Route,
    pub template: OperationTemplate,
    /// Candidate failures; empty for routes that always succeed.
    pub scenarios: Vec<ErrorScenario>,
    /// Logged when the request arrives, before any simulated work.
    pub entry_log: Option<LogLine>,
    /// Work areas named in the success payload.
    pub summary: Vec<&'static str>,
}

impl RouteSpec {
    pub fn new(route: Route, template: OperationTemplate) -> Self {
        Self {
            route,
            template,
            scenarios: Vec::new(),
            entry_log: None,
            summary: Vec::new(),
        }
    }

    pub fn scenarios(mut self, scenarios: Vec<ErrorScenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn entry_log(mut self, line: LogLine) -> Self {
        self.entry_log = Some(line);
        self
    }

    pub fn summary(mut self, areas: impl IntoIterator<Item = &'static str>) -> Self {
        self.summary = areas.into_iter().collect();
        self
    }
}

/// Route specs for one profile, plus the background job template.
#[derive(Debug, Clone)]
pub struct RouteCatalog {
    profile: RouteProfile,
    specs: Vec<RouteSpec>,
    background: OperationTemplate,
}

impl RouteCatalog {
    pub fn new(profile: RouteProfile) -> Self {
        Self {
            profile,
            specs: Route::ALL.iter().map(|r| catalog::route_spec(profile, *r)).collect(),
            background: catalog::background_job(),
        }
    }

    pub fn profile(&self) -> RouteProfile {
        self.profile
    }

    pub fn get(&self, route: Route) -> &RouteSpec {
        &self.specs[route.index()]
    }

    pub fn background(&self) -> &OperationTemplate {
        &self.background
    }
}

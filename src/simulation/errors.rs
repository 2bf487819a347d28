//! Simulated failure scenarios.
//!
//! # Responsibilities
//! - Pick one scenario per request from a route's candidate set
//! - Attach failure attributes at the operation that "failed"
//! - Copy `error` / `error.type` up through every ancestor to the root
//!
//! # Design Decisions
//! - Failures are attribute copies, not control flow: the request always
//!   completes and the handler maps the scenario to a status code
//! - Choices are independent across requests; no shared state, no backoff
//! - A more specific `error.type` already set on an ancestor is kept

use std::fmt;

use crate::simulation::instance::{AttrValue, OperationInstance};
use crate::simulation::random::RandomSource;
use crate::simulation::template::OperationTemplate;

/// Kind of simulated failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DatabaseError,
    Timeout,
    ValidationError,
    NotFound,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::DatabaseError,
        ErrorKind::Timeout,
        ErrorKind::ValidationError,
        ErrorKind::NotFound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DatabaseError => "db_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::NotFound => "not_found",
        }
    }

    /// HTTP status the route answers with when this kind fires.
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::DatabaseError => 500,
            ErrorKind::Timeout => 408,
            ErrorKind::ValidationError => 400,
            ErrorKind::NotFound => 404,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way an error-simulating route can fail.
#[derive(Debug, Clone)]
pub struct ErrorScenario {
    pub kind: ErrorKind,
    /// User-facing message, returned as `{"error": message}`.
    pub message: &'static str,
    /// Extra response fields next to `error`.
    pub extra: Vec<(&'static str, &'static str)>,
    /// Line logged at error level, correlated with the failing operation.
    pub log_message: &'static str,
    /// Operations executed when the scenario fires, appended under the route root.
    pub subtree: Option<OperationTemplate>,
    /// Operation that fails. `None` means the route root itself.
    pub failing_operation: Option<&'static str>,
    /// Attributes attached at the failing operation.
    pub attributes: Vec<(&'static str, AttrValue)>,
    /// Attributes for specific intermediate operations, keyed by operation name.
    pub ancestor_attributes: Vec<(&'static str, &'static str, AttrValue)>,
}

impl ErrorScenario {
    pub fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            extra: Vec::new(),
            log_message: message,
            subtree: None,
            failing_operation: None,
            attributes: Vec::new(),
            ancestor_attributes: Vec::new(),
        }
    }

    pub fn logging(mut self, message: &'static str) -> Self {
        self.log_message = message;
        self
    }

    pub fn extra(mut self, key: &'static str, value: &'static str) -> Self {
        self.extra.push((key, value));
        self
    }

    pub fn running(mut self, subtree: OperationTemplate) -> Self {
        self.subtree = Some(subtree);
        self
    }

    pub fn failing_at(mut self, operation: &'static str) -> Self {
        self.failing_operation = Some(operation);
        self
    }

    pub fn attr(mut self, key: &'static str, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }

    pub fn ancestor_attr(mut self, operation: &'static str, key: &'static str, value: impl Into<AttrValue>) -> Self {
        self.ancestor_attributes.push((operation, key, value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}

/// Chooses and applies error scenarios.
pub struct ErrorInjector;

impl ErrorInjector {
    /// Uniform choice among `candidates`; `None` when the route never fails.
    pub fn maybe_inject<'s>(
        candidates: &'s [ErrorScenario],
        rng: &mut dyn RandomSource,
    ) -> Option<&'s ErrorScenario> {
        if candidates.is_empty() {
            return None;
        }
        candidates.get(rng.index(candidates.len()))
    }

    /// Marks the failing operation and every ancestor of it.
    ///
    /// Returns the path to the failing operation, or `None` if it is missing
    /// from the tree (the scenario then lands on the root).
    pub fn apply(root: &mut OperationInstance, scenario: &ErrorScenario) -> Option<Vec<usize>> {
        let path = match scenario.failing_operation {
            Some(name) => root.path_to(name),
            None => Some(Vec::new()),
        };
        let steps = path.clone().unwrap_or_default();

        let mut node = root;
        for index in steps {
            Self::mark_ancestor(node, scenario);
            node = &mut node.children[index];
        }

        node.attributes.insert("error", AttrValue::Bool(true));
        node.attributes
            .insert("error.type", AttrValue::Str(scenario.kind.as_str().to_string()));
        for (key, value) in &scenario.attributes {
            node.attributes.insert(*key, value.clone());
        }

        path
    }

    fn mark_ancestor(node: &mut OperationInstance, scenario: &ErrorScenario) {
        for (operation, key, value) in &scenario.ancestor_attributes {
            if *operation == node.name {
                node.attributes.insert(*key, value.clone());
            }
        }
        node.attributes.insert("error", AttrValue::Bool(true));
        node.attributes
            .entry("error.type")
            .or_insert_with(|| AttrValue::Str(scenario.kind.as_str().to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::LogEmitter;
    use crate::simulation::builder::BuildContext;
    use crate::simulation::random::ScriptedSource;

    fn deadlock() -> ErrorScenario {
        ErrorScenario::new(ErrorKind::DatabaseError, "Database error - transaction deadlock")
            .running(
                OperationTemplate::new("db.transaction")
                    .child(OperationTemplate::new("db.begin_transaction").lasting(0.005, 0.01))
                    .child(OperationTemplate::new("db.execute_query").lasting(0.02, 0.04)),
            )
            .failing_at("db.execute_query")
            .attr("error.type", "deadlock")
            .attr("error.message", "Deadlock detected")
            .ancestor_attr("db.transaction", "error.type", "database_error")
    }

    #[test]
    fn test_status_mapping_is_fixed() {
        let statuses: Vec<u16> = ErrorKind::ALL.iter().map(|k| k.status()).collect();
        assert_eq!(statuses, vec![500, 408, 400, 404]);
        assert_eq!(ErrorKind::ValidationError.to_string(), "validation_error");
    }

    #[test]
    fn test_no_candidates_never_injects() {
        let mut rng = ScriptedSource::new([3], []);
        assert!(ErrorInjector::maybe_inject(&[], &mut rng).is_none());
    }

    #[test]
    fn test_choice_follows_the_random_source() {
        let candidates: Vec<ErrorScenario> = ErrorKind::ALL
            .iter()
            .map(|k| ErrorScenario::new(*k, "boom"))
            .collect();
        let mut rng = ScriptedSource::new([2, 0, 3], []);
        let picked: Vec<ErrorKind> = (0..3)
            .filter_map(|_| ErrorInjector::maybe_inject(&candidates, &mut rng))
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            picked,
            vec![ErrorKind::ValidationError, ErrorKind::DatabaseError, ErrorKind::NotFound]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attributes_climb_to_the_root() {
        let scenario = deadlock();
        let template = OperationTemplate::new("error_endpoint")
            .child(OperationTemplate::new("auth.check").lasting(0.01, 0.02))
            .child(scenario.subtree.clone().unwrap());

        let logs = LogEmitter::new("test");
        let mut rng = ScriptedSource::new([], []);
        let mut tree = BuildContext::new(&mut rng, &logs).build(&template).await;

        let path = ErrorInjector::apply(&mut tree, &scenario);
        assert_eq!(path, Some(vec![1, 1]));

        let failing = tree.find("db.execute_query").unwrap();
        assert!(failing.is_error());
        assert_eq!(failing.attributes["error.type"], AttrValue::from("deadlock"));
        assert_eq!(failing.attributes["error.message"], AttrValue::from("Deadlock detected"));

        let transaction = tree.find("db.transaction").unwrap();
        assert!(transaction.is_error());
        assert_eq!(transaction.attributes["error.type"], AttrValue::from("database_error"));

        assert!(tree.is_error());
        assert_eq!(tree.attributes["error.type"], AttrValue::from("db_error"));

        let bystanders = [tree.find("auth.check").unwrap(), tree.find("db.begin_transaction").unwrap()];
        assert!(bystanders.iter().all(|n| !n.is_error()));
    }

    async fn build_with(scenario: &ErrorScenario) -> OperationInstance {
        let template = OperationTemplate::new("error_endpoint").child(scenario.subtree.clone().unwrap());
        let logs = LogEmitter::new("test");
        let mut rng = ScriptedSource::new([], []);
        BuildContext::new(&mut rng, &logs).build(&template).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_the_order_as_downstream() {
        let scenario = ErrorScenario::new(ErrorKind::Timeout, "Payment service timeout")
            .running(
                OperationTemplate::new("business.process_order")
                    .child(OperationTemplate::new("cache.get").lasting(0.005, 0.01))
                    .child(OperationTemplate::new("http.call_payment_api").lasting(0.5, 1.0)),
            )
            .failing_at("http.call_payment_api")
            .attr("error.type", "timeout")
            .attr("error.message", "Request timeout after 30s")
            .ancestor_attr("business.process_order", "error.type", "downstream_timeout");
        let mut tree = build_with(&scenario).await;

        assert_eq!(ErrorInjector::apply(&mut tree, &scenario), Some(vec![0, 1]));

        let call = tree.find("http.call_payment_api").unwrap();
        assert_eq!(call.attributes["error.type"], AttrValue::from("timeout"));
        assert_eq!(call.attributes["error.message"], AttrValue::from("Request timeout after 30s"));

        let order = tree.find("business.process_order").unwrap();
        assert!(order.is_error());
        assert_eq!(order.attributes["error.type"], AttrValue::from("downstream_timeout"));

        assert_eq!(tree.attributes["error.type"], AttrValue::from("timeout"));
        assert!(!tree.find("cache.get").unwrap().is_error());
        assert_eq!(scenario.status(), 408);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_names_the_failed_field_on_the_check() {
        let scenario = ErrorScenario::new(ErrorKind::ValidationError, "Validation failed")
            .extra("field", "email")
            .running(
                OperationTemplate::new("validation.check_input")
                    .child(OperationTemplate::new("validation.schema_check").lasting(0.005, 0.01))
                    .child(OperationTemplate::new("validation.business_rules").lasting(0.01, 0.02)),
            )
            .failing_at("validation.business_rules")
            .attr("error.type", "validation_failed")
            .attr("error.message", "Invalid email format")
            .ancestor_attr("validation.check_input", "validation.failed_field", "email");
        let mut tree = build_with(&scenario).await;

        ErrorInjector::apply(&mut tree, &scenario);

        let rules = tree.find("validation.business_rules").unwrap();
        assert_eq!(rules.attributes["error.type"], AttrValue::from("validation_failed"));
        assert!(!rules.attributes.contains_key("validation.failed_field"));

        let check = tree.find("validation.check_input").unwrap();
        assert!(check.is_error());
        assert_eq!(check.attributes["validation.failed_field"], AttrValue::from("email"));
        assert_eq!(check.attributes["error.type"], AttrValue::from("validation_error"));

        assert!(!tree.attributes.contains_key("validation.failed_field"));
        assert_eq!(tree.attributes["error.type"], AttrValue::from("validation_error"));
        assert!(!tree.find("validation.schema_check").unwrap().is_error());
        assert_eq!(scenario.status(), 400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_operation_lands_on_root() {
        let scenario = ErrorScenario::new(ErrorKind::NotFound, "Resource not found").failing_at("nowhere");
        let logs = LogEmitter::new("test");
        let mut rng = ScriptedSource::new([], []);
        let mut tree = BuildContext::new(&mut rng, &logs)
            .build(&OperationTemplate::new("error_endpoint"))
            .await;

        assert_eq!(ErrorInjector::apply(&mut tree, &scenario), None);
        assert_eq!(tree.attributes["error.type"], AttrValue::from("not_found"));
    }
}
